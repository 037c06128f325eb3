use crate::database::settings_repository::{keys, SettingsRepository};
use crate::error::{AppError, AppErrorKind, DomainError, InfrastructureError};
use std::sync::Arc;
use tracing::info;

/// Allocates human-readable payment link reference IDs,
/// e.g. `INV-2425-000042`.
///
/// The counter lives in app_settings and is advanced with a single atomic
/// UPDATE..RETURNING, so two concurrent allocations can never produce the
/// same number. A number consumed by a later gateway failure stays consumed;
/// gaps in the sequence are accepted, reuse is not.
pub struct SequenceAllocator {
    settings: Arc<SettingsRepository>,
}

impl SequenceAllocator {
    pub fn new(settings: Arc<SettingsRepository>) -> Self {
        Self { settings }
    }

    pub async fn allocate(&self, link_type: &str) -> Result<String, AppError> {
        let prefixes = self
            .settings
            .json_map(keys::PAYMENT_LINK_ID_PREFIX)
            .await
            .map_err(|e| {
                AppError::new(AppErrorKind::Infrastructure(
                    InfrastructureError::Configuration {
                        message: format!("{}: {}", keys::PAYMENT_LINK_ID_PREFIX, e),
                    },
                ))
            })?;

        // Prefix lookup happens before the increment so an unknown link
        // type never consumes a number.
        let prefix = prefixes.get(link_type).ok_or_else(|| {
            AppError::new(AppErrorKind::Domain(DomainError::UnknownLinkType {
                link_type: link_type.to_string(),
            }))
        })?;

        let financial_year = self
            .settings
            .require(keys::CURRENT_FINANCIAL_YEAR)
            .await
            .map_err(|e| {
                AppError::new(AppErrorKind::Infrastructure(
                    InfrastructureError::Configuration {
                        message: format!("{}: {}", keys::CURRENT_FINANCIAL_YEAR, e),
                    },
                ))
            })?;

        let number = self
            .settings
            .increment_counter(keys::PAYMENT_LINK_NUMBER)
            .await
            .map_err(|e| {
                AppError::new(AppErrorKind::Infrastructure(
                    InfrastructureError::Configuration {
                        message: format!("{}: {}", keys::PAYMENT_LINK_NUMBER, e),
                    },
                ))
            })?;

        let reference_id = format_reference(prefix, &financial_year, number);
        info!(link_type = link_type, reference_id = %reference_id, "allocated link reference");
        Ok(reference_id)
    }
}

pub fn format_reference(prefix: &str, financial_year: &str, number: i64) -> String {
    format!("{}-{}-{:06}", prefix, financial_year, number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_format_zero_pads_to_six_digits() {
        assert_eq!(format_reference("INV", "2425", 42), "INV-2425-000042");
        assert_eq!(format_reference("ADV", "2425", 1), "ADV-2425-000001");
    }

    #[test]
    fn reference_format_does_not_truncate_large_numbers() {
        assert_eq!(
            format_reference("INV", "2425", 1_234_567),
            "INV-2425-1234567"
        );
    }

    #[test]
    fn numeric_suffixes_increase_with_the_counter() {
        let ids: Vec<String> = (40..45)
            .map(|n| format_reference("INV", "2425", n))
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }
}
