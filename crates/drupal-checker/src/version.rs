//! 시맨틱 버전 비교 -- composer 제약 조건 정리와 업데이트 심각도 분류
//!
//! `semver` 크레이트를 사용합니다. composer 제약 조건(`^1.2`, `~2.0.1`,
//! `8.x-1.10`, `1.0.0@beta`, `^1.0 || ^2.0`)은 비교 전에 단일 버전으로 정리합니다.
//! 정리할 수 없는 제약(`*`, `1.x-dev`, `dev-main`)은 비교하지 않습니다.

use semver::Version;

use repowatch_core::types::UpdateSeverity;

/// 불안정 릴리스로 취급하는 표식
const UNSTABLE_MARKERS: &[&str] = &["dev", "alpha", "beta", "rc"];

/// 제약 조건 앞에 붙는 연산자 문자
const OPERATOR_CHARS: &[char] = &['^', '~', '>', '<', '=', '!', 'v', 'V'];

/// composer 제약 조건 또는 레지스트리 버전 문자열을 semver로 정리합니다.
///
/// # 정리 규칙
///
/// - `||` / `|` 대안 중 첫 번째, 공백/쉼표로 구분된 범위 중 첫 번째 항목
/// - 앞의 연산자(`^ ~ >= <= > < = != v`) 제거
/// - legacy `8.x-` 접두어 제거
/// - `@stability` 플래그 제거
/// - 부족한 구성요소 채움 (`1.2` -> `1.2.0`)
pub fn clean_version(raw: &str) -> Option<Version> {
    let first = raw.split('|').map(str::trim).find(|s| !s.is_empty())?;
    let first = first.split([' ', ',']).find(|s| !s.is_empty())?;
    let first = first.trim_start_matches(OPERATOR_CHARS);
    let first = first.split('@').next().unwrap_or(first);
    let first = strip_legacy_prefix(first);

    let lower = first.to_lowercase();
    if lower.is_empty() || lower.starts_with("dev-") || lower.contains('*') {
        return None;
    }

    let (numbers, pre) = match first.split_once('-') {
        Some((numbers, pre)) => (numbers, Some(pre)),
        None => (first, None),
    };

    let mut parts = Vec::with_capacity(3);
    for part in numbers.split('.') {
        // 1.x, 2.0.x 같은 와일드카드 구성요소
        let n: u64 = part.parse().ok()?;
        parts.push(n);
    }
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    parts.resize(3, 0);

    let mut normalized = format!("{}.{}.{}", parts[0], parts[1], parts[2]);
    if let Some(pre) = pre {
        if pre.to_lowercase() == "dev" {
            return None;
        }
        normalized.push('-');
        normalized.push_str(pre);
    }
    Version::parse(&normalized).ok()
}

/// `8.x-1.10` -> `1.10`
fn strip_legacy_prefix(s: &str) -> &str {
    if let Some((core, rest)) = s.split_once(".x-")
        && !core.is_empty()
        && core.bytes().all(|b| b.is_ascii_digit())
    {
        return rest;
    }
    s
}

/// 안정 릴리스 여부 (dev/alpha/beta/rc가 아님)
pub fn is_stable(version: &str) -> bool {
    let lower = version.to_lowercase();
    !UNSTABLE_MARKERS.iter().any(|m| lower.contains(m))
}

/// 버전 목록에서 최신 안정 버전을 고릅니다.
///
/// semver로 정리할 수 있는 버전 중 가장 큰 것을 반환합니다. 정리할 수 있는
/// 버전이 하나도 없으면 처음 나온 안정 버전을 반환합니다.
pub fn latest_stable<'a>(versions: impl IntoIterator<Item = &'a str>) -> Option<String> {
    let mut first_stable: Option<&str> = None;
    let mut best: Option<(Version, &str)> = None;

    for raw in versions.into_iter().filter(|v| is_stable(v)) {
        first_stable.get_or_insert(raw);
        if let Some(parsed) = clean_version(raw)
            && best.as_ref().is_none_or(|(b, _)| parsed > *b)
        {
            best = Some((parsed, raw));
        }
    }

    best.map(|(_, raw)| raw)
        .or(first_stable)
        .map(str::to_owned)
}

/// 현재 제약 조건과 최신 버전을 비교해 업데이트 심각도를 분류합니다.
///
/// - 둘 중 하나라도 정리할 수 없으면 `Unknown`
/// - 현재 >= 최신이면 `None`
/// - major가 다르면 `Major`, minor가 다르면 `Minor`, 그 외 `Patch`
pub fn classify(current: &str, latest: &str) -> UpdateSeverity {
    let (Some(cur), Some(late)) = (clean_version(current), clean_version(latest)) else {
        return UpdateSeverity::Unknown;
    };

    if cur >= late {
        return UpdateSeverity::None;
    }

    if late.major > cur.major {
        UpdateSeverity::Major
    } else if late.minor > cur.minor {
        UpdateSeverity::Minor
    } else {
        UpdateSeverity::Patch
    }
}
