use super::host::NotifyOptions;

pub const DEFAULT_META_TYPE: &str = "arrayItem";
pub const RESOLVE_ERRORS_KEY: &str = "apostrophe:resolveErrorsFirst";

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub meta_type: String,
    pub warning_key: String,
    pub warning: NotifyOptions,
    pub scroll_to_server_error: bool,
    pub validate_schema_fields: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            meta_type: DEFAULT_META_TYPE.to_string(),
            warning_key: RESOLVE_ERRORS_KEY.to_string(),
            warning: NotifyOptions::warning(),
            scroll_to_server_error: true,
            validate_schema_fields: true,
        }
    }
}

impl SessionOptions {
    pub fn with_meta_type(mut self, meta_type: impl Into<String>) -> Self {
        self.meta_type = meta_type.into();
        self
    }

    pub fn with_warning(mut self, key: impl Into<String>, options: NotifyOptions) -> Self {
        self.warning_key = key.into();
        self.warning = options;
        self
    }

    pub fn with_scroll_to_server_error(mut self, enabled: bool) -> Self {
        self.scroll_to_server_error = enabled;
        self
    }

    pub fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.validate_schema_fields = enabled;
        self
    }
}
