/// Flags forwarded to worker-side application code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeOptions {
    pub devtools: bool,
    pub hot_reload: bool,
}

impl BridgeOptions {
    /// Reads flags from a location query string such as `?devtools&hotreload`.
    ///
    /// A flag matches only as a whole word.
    pub fn from_query(search: &str) -> Self {
        let mut options = Self::default();
        for word in search.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_')) {
            match word {
                "devtools" => options.devtools = true,
                "hotreload" => options.hot_reload = true,
                _ => {}
            }
        }
        options
    }
}
