//! 설정 노출 탐지: 저장소에 커밋된 자격증명 파일
//!
//! 파일 이름 규칙으로 판별하며, `.pem`/`.key`는 내용 앞부분을 확인해
//! 개인키가 들어 있으면 Critical로 올립니다.

use std::io::Read;
use std::path::{Path, PathBuf};

use repowatch_core::types::{FindingKind, Severity, VulnerabilityFinding};

/// 설정 감사 도구 이름 (보고서의 `tool` 필드)
pub const CONFIG_AUDIT_TOOL: &str = "config-audit";

/// 개인키 여부 확인을 위해 읽는 최대 바이트 수
const KEY_SNIFF_BYTES: u64 = 4096;

/// 템플릿으로 취급하는 `.env` 접미사
const ENV_TEMPLATE_SUFFIXES: &[&str] = &[".example", ".sample", ".template", ".dist", ".defaults"];

const SSH_PRIVATE_KEYS: &[&str] = &["id_rsa", "id_dsa", "id_ecdsa", "id_ed25519"];

const STORED_CREDENTIALS: &[&str] = &[".git-credentials", ".netrc", ".pgpass", ".htpasswd"];

const SECRETS_FILES: &[&str] = &[
    "credentials.json",
    "secrets.yml",
    "secrets.yaml",
    "secrets.json",
    "service-account.json",
];

/// 탐지 규칙
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialRule {
    /// 커밋된 `.env` 파일
    EnvFile,
    /// 개인키
    PrivateKey,
    /// PKCS#12 / Java keystore
    Keystore,
    /// 인증서 또는 키 파일 (개인키 여부 미확인)
    KeyMaterial,
    /// 저장된 자격증명 (`.git-credentials`, `.htpasswd` 등)
    StoredCredentials,
    /// 비밀값 파일 (`credentials.json`, `secrets.yml` 등)
    SecretsFile,
}

impl CredentialRule {
    pub fn id(self) -> &'static str {
        match self {
            Self::EnvFile => "exposed-env-file",
            Self::PrivateKey => "private-key",
            Self::Keystore => "keystore",
            Self::KeyMaterial => "key-material",
            Self::StoredCredentials => "stored-credentials",
            Self::SecretsFile => "secrets-file",
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Self::PrivateKey => Severity::Critical,
            _ => Severity::High,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::EnvFile => "environment file committed to the repository",
            Self::PrivateKey => "private key committed to the repository",
            Self::Keystore => "keystore committed to the repository",
            Self::KeyMaterial => "certificate or key file committed to the repository",
            Self::StoredCredentials => "stored credentials committed to the repository",
            Self::SecretsFile => "secrets file committed to the repository",
        }
    }
}

/// 탐지된 파일
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialMatch {
    pub rule: CredentialRule,
    /// 저장소 기준 상대 경로
    pub path: PathBuf,
}

impl CredentialMatch {
    pub fn to_finding(&self) -> VulnerabilityFinding {
        VulnerabilityFinding {
            kind: FindingKind::Config,
            severity: self.rule.severity(),
            tool: CONFIG_AUDIT_TOOL.to_owned(),
            identifier: self.rule.id().to_owned(),
            description: self.rule.description().to_owned(),
            location: self.path.display().to_string(),
        }
    }
}

/// 파일이 자격증명 파일인지 판별합니다.
///
/// `abs`는 내용 확인용 실제 경로, `rel`은 보고서용 상대 경로입니다.
pub fn match_credential_file(abs: &Path, rel: &Path) -> Option<CredentialMatch> {
    let name = abs.file_name()?.to_str()?;
    let rule = classify_name(name)?;

    let rule = if rule == CredentialRule::KeyMaterial && contains_private_key(abs) {
        CredentialRule::PrivateKey
    } else {
        rule
    };

    Some(CredentialMatch {
        rule,
        path: rel.to_path_buf(),
    })
}

/// 파일 이름만으로 규칙을 결정합니다.
pub fn classify_name(name: &str) -> Option<CredentialRule> {
    let lower = name.to_lowercase();

    if lower == ".env" || lower.starts_with(".env.") {
        if ENV_TEMPLATE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            return None;
        }
        return Some(CredentialRule::EnvFile);
    }

    if SSH_PRIVATE_KEYS.contains(&lower.as_str()) {
        return Some(CredentialRule::PrivateKey);
    }

    if STORED_CREDENTIALS.contains(&lower.as_str()) {
        return Some(CredentialRule::StoredCredentials);
    }

    if SECRETS_FILES.contains(&lower.as_str()) {
        return Some(CredentialRule::SecretsFile);
    }

    let ext = lower.rsplit_once('.').map(|(_, ext)| ext)?;
    match ext {
        "p12" | "pfx" | "jks" | "keystore" => Some(CredentialRule::Keystore),
        "pem" | "key" => Some(CredentialRule::KeyMaterial),
        _ => None,
    }
}

fn contains_private_key(path: &Path) -> bool {
    let Ok(file) = std::fs::File::open(path) else {
        return false;
    };
    let mut head = Vec::new();
    if file.take(KEY_SNIFF_BYTES).read_to_end(&mut head).is_err() {
        return false;
    }
    String::from_utf8_lossy(&head).contains("PRIVATE KEY")
}
