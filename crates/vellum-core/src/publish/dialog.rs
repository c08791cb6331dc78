use tracing::debug;

use super::eligibility::{self, VariantSnapshot, is_modified, reset_selection};
use crate::model::culture::Culture;

/// Send-to-publish selection over a caller-owned variant list.
///
/// Opening the dialog orders the list and pre-selects the active culture.
/// However the dialog ends (submit, cancel, or plain drop) every
/// `send_to_publish` flag in the list is reset.
#[derive(Debug)]
pub struct SendToPublishDialog<'a> {
    variants: &'a mut [VariantSnapshot],
}

impl<'a> SendToPublishDialog<'a> {
    pub fn open(variants: &'a mut [VariantSnapshot], active_culture: Option<&Culture>) -> Self {
        eligibility::apply(variants, active_culture);
        debug!(variants = variants.len(), "opened send-to-publish dialog");
        Self { variants }
    }

    #[must_use]
    pub fn variants(&self) -> &[VariantSnapshot] {
        self.variants
    }

    #[must_use]
    pub fn submission_disabled(&self) -> bool {
        self.variants.is_empty()
    }

    /// Flip the selection of `culture`. Returns the new flag, or `None` when
    /// the culture is not in the list.
    pub fn toggle(&mut self, culture: &Culture) -> Option<bool> {
        let variant = self.variants.iter_mut().find(|v| v.culture == *culture)?;
        variant.send_to_publish = !variant.send_to_publish;
        Some(variant.send_to_publish)
    }

    /// Cultures selected for submission that actually carry changes.
    #[must_use]
    pub fn submission(&self) -> Vec<Culture> {
        self.variants
            .iter()
            .filter(|v| v.send_to_publish && is_modified(v))
            .map(|v| v.culture.clone())
            .collect()
    }

    /// Close the dialog and hand back the submitted cultures.
    #[must_use]
    pub fn submit(self) -> Vec<Culture> {
        self.submission()
    }

    pub fn cancel(self) {}
}

impl Drop for SendToPublishDialog<'_> {
    fn drop(&mut self) {
        reset_selection(self.variants);
    }
}

#[cfg(test)]
mod tests {
    use super::SendToPublishDialog;
    use crate::model::culture::Culture;
    use crate::model::variant::PublicationState;
    use crate::publish::VariantSnapshot;

    fn culture(code: &str) -> Culture {
        code.parse().unwrap()
    }

    fn variants() -> Vec<VariantSnapshot> {
        vec![
            VariantSnapshot::new(culture("en"), PublicationState::Published),
            VariantSnapshot::new(culture("fr"), PublicationState::Draft),
            VariantSnapshot::new(culture("de"), PublicationState::Published).dirty(),
        ]
    }

    #[test]
    fn drop_resets_every_flag() {
        let mut list = variants();
        {
            let mut dialog = SendToPublishDialog::open(&mut list, Some(&culture("fr")));
            assert!(dialog.variants()[0].send_to_publish);
            dialog.toggle(&culture("en"));
        }
        assert!(list.iter().all(|v| !v.send_to_publish));
        assert_eq!(list[0].culture.as_str(), "fr");
    }

    #[test]
    fn submission_skips_unmodified_selections() {
        let mut list = variants();
        let mut dialog = SendToPublishDialog::open(&mut list, Some(&culture("fr")));
        assert_eq!(dialog.toggle(&culture("en")), Some(true));
        assert_eq!(dialog.toggle(&culture("de")), Some(true));
        assert_eq!(dialog.toggle(&culture("ja")), None);

        let submitted = dialog.submit();
        assert_eq!(submitted, vec![culture("fr"), culture("de")]);
        assert!(list.iter().all(|v| !v.send_to_publish));
    }

    #[test]
    fn cancel_resets_and_empty_disables() {
        let mut empty: Vec<VariantSnapshot> = Vec::new();
        let dialog = SendToPublishDialog::open(&mut empty, None);
        assert!(dialog.submission_disabled());
        dialog.cancel();

        let mut list = variants();
        SendToPublishDialog::open(&mut list, Some(&culture("en"))).cancel();
        assert!(list.iter().all(|v| !v.send_to_publish));
    }
}
