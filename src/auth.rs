use crate::config::AuthConfig;

#[derive(Clone, Debug)]
pub struct ApiKeyAuth {
    enabled: bool,
    header_name: String,
    allowed: Vec<String>,
}

impl ApiKeyAuth {
    pub fn new(cfg: &AuthConfig) -> Self {
        Self {
            enabled: cfg.enabled,
            header_name: cfg.header_name.to_lowercase(),
            allowed: cfg.allowed_keys.clone(),
        }
    }

    pub fn header_name(&self) -> &str {
        &self.header_name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn validate(&self, presented: Option<&str>) -> bool {
        if !self.enabled {
            return true;
        }
        let key = match presented {
            Some(k) if !k.is_empty() => k,
            _ => return false,
        };
        self.allowed
            .iter()
            .any(|allowed| constant_time_eq(allowed.as_bytes(), key.as_bytes()))
    }
}

// Compares every byte so timing does not leak the matching prefix length.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
