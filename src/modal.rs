use crate::feature::FeatureKind;

/// The two mutually exclusive actions offered for a ready binary artifact.
/// Both re-invoke the generation endpoint; only the `download` flag differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalChoice {
    View,
    Download,
}

impl ModalChoice {
    pub fn download_flag(self) -> bool {
        matches!(self, ModalChoice::Download)
    }

    pub fn label(self) -> &'static str {
        match self {
            ModalChoice::View => "View",
            ModalChoice::Download => "Download",
        }
    }
}

pub const MODAL_CHOICES: [ModalChoice; 2] = [ModalChoice::View, ModalChoice::Download];

/// State of the view/download dialog for one binary-kind feature. Modal
/// visibility is independent of the feature's phase: the artifact existing
/// and the dialog being open are separate facts.
#[derive(Debug)]
pub struct ModalState {
    pub kind: FeatureKind,
    /// The text that produced the ready artifact. Fetches committed from
    /// this dialog re-send it, so editing the prompt afterwards cannot
    /// change which artifact view/download retrieve.
    pub text: String,
    pub selected: ModalChoice,
    /// Set while a fetch is outstanding; blocks a second commit and
    /// selection changes. Esc still closes the dialog, abandoning the fetch.
    pub busy: Option<ModalChoice>,
}

impl ModalState {
    pub fn open(kind: FeatureKind, text: String) -> Self {
        Self {
            kind,
            text,
            selected: ModalChoice::View,
            busy: None,
        }
    }

    pub fn toggle(&mut self) {
        if self.busy.is_some() {
            return;
        }
        self.selected = match self.selected {
            ModalChoice::View => ModalChoice::Download,
            ModalChoice::Download => ModalChoice::View,
        };
    }

    /// Commit the selected action. Returns None while a fetch is outstanding.
    pub fn commit(&mut self) -> Option<ModalChoice> {
        if self.busy.is_some() {
            return None;
        }
        self.busy = Some(self.selected);
        Some(self.selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choices_map_to_the_download_flag() {
        assert!(!ModalChoice::View.download_flag());
        assert!(ModalChoice::Download.download_flag());
    }

    #[test]
    fn toggle_alternates_between_the_two_actions() {
        let mut modal = ModalState::open(FeatureKind::Roadmap, "an idea".into());
        assert_eq!(modal.selected, ModalChoice::View);
        modal.toggle();
        assert_eq!(modal.selected, ModalChoice::Download);
        modal.toggle();
        assert_eq!(modal.selected, ModalChoice::View);
    }

    #[test]
    fn commit_is_single_flight() {
        let mut modal = ModalState::open(FeatureKind::Video, "an idea".into());
        modal.toggle();
        assert_eq!(modal.commit(), Some(ModalChoice::Download));
        // Second commit and selection changes are blocked while busy.
        assert_eq!(modal.commit(), None);
        modal.toggle();
        assert_eq!(modal.selected, ModalChoice::Download);
    }
}
