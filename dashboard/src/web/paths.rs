/// URL builder for the dashboard routes, aware of the mount prefix.
///
/// Templates never hard-code hrefs; every link and `hx-post` target comes
/// from here so the dashboard can live under any base path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paths {
    base: String,
}

impl Paths {
    /// `base` is normalised to either `""` or `/segment[/segment..]` with no
    /// trailing slash.
    pub fn new(base: &str) -> Self {
        let trimmed = base.trim().trim_matches('/');
        let base = if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        };
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn status(&self) -> String {
        if self.base.is_empty() {
            "/".to_string()
        } else {
            self.base.clone()
        }
    }

    pub fn up(&self) -> String {
        format!("{}/up", self.base)
    }

    pub fn down(&self) -> String {
        format!("{}/down", self.base)
    }

    pub fn up_to(&self, version: i64) -> String {
        format!("{}/up-to/{version}", self.base)
    }

    pub fn down_to(&self, version: i64) -> String {
        format!("{}/down-to/{version}", self.base)
    }
}
