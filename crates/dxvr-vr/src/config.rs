/// Environment variable enabling [`VrConfig::validation`].
pub const VALIDATION_ENV: &str = "DXVR_VR_VALIDATION";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VrConfig {
    /// Check that handed-out descriptors never reference a multisampled image and warn about
    /// unbalanced unlocks.
    pub validation: bool,
}

impl VrConfig {
    pub fn from_env() -> Self {
        Self {
            validation: std::env::var(VALIDATION_ENV)
                .map(|raw| parse_flag(&raw))
                .unwrap_or(false),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}
