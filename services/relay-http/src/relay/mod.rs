mod catalog;
mod error;
mod local;
mod normalize;
mod shape;

pub use catalog::{CatalogClient, CatalogDiagnostics};
pub use error::RelayError;
pub use local::{LocalApiClient, LocalProbe};
pub use normalize::{
    discount_percent, ExtendedProduct, ProductSummary, SupplierInfo, WarehouseStock,
    BRAND_PLACEHOLDER, NAME_PLACEHOLDER,
};
pub use shape::{resolve_product, UpstreamShape};

use serde_json::Value;

/// Characters of an unparsable upstream body kept for diagnostics.
pub const BODY_PREVIEW_CHARS: usize = 200;
pub const DIAGNOSTIC_PREVIEW_CHARS: usize = 500;

pub(crate) fn preview(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

pub(crate) fn parse_json_body(body: &str) -> Result<Value, RelayError> {
    serde_json::from_str(body).map_err(|_| RelayError::MalformedUpstream {
        preview: preview(body, BODY_PREVIEW_CHARS),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_respects_char_boundaries() {
        let body = "ж".repeat(300);
        let cut = preview(&body, BODY_PREVIEW_CHARS);

        assert_eq!(cut.chars().count(), BODY_PREVIEW_CHARS);
    }

    #[test]
    fn test_parse_json_body_truncates_preview() {
        let body = format!("<html>{}</html>", "x".repeat(1000));

        match parse_json_body(&body) {
            Err(RelayError::MalformedUpstream { preview }) => {
                assert_eq!(preview.len(), BODY_PREVIEW_CHARS);
                assert!(preview.starts_with("<html>"));
            }
            other => panic!("expected MalformedUpstream, got {other:?}"),
        }
    }
}
