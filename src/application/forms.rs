//! Open/edit/submit lifecycle of a creation form.

use crate::domain::forms::Draft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    Closed,
    Editing,
    Submitting,
}

impl FormPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            FormPhase::Closed => "closed",
            FormPhase::Editing => "editing",
            FormPhase::Submitting => "submitting",
        }
    }
}

/// Form state for one view. Transitions that do not apply to the current
/// phase are ignored and reported through the return value.
#[derive(Debug, Clone)]
pub struct FormMachine<D> {
    phase: FormPhase,
    draft: D,
}

impl<D: Draft> Default for FormMachine<D> {
    fn default() -> Self {
        Self {
            phase: FormPhase::Closed,
            draft: D::default(),
        }
    }
}

impl<D: Draft> FormMachine<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn is_open(&self) -> bool {
        self.phase != FormPhase::Closed
    }

    pub fn open(&mut self) -> bool {
        if self.phase != FormPhase::Closed {
            return false;
        }
        self.phase = FormPhase::Editing;
        true
    }

    /// Close the form and drop the draft.
    pub fn cancel(&mut self) -> bool {
        if self.phase != FormPhase::Editing {
            return false;
        }
        self.phase = FormPhase::Closed;
        self.draft = D::default();
        true
    }

    /// Open when closed, cancel when editing. Returns the resulting phase.
    pub fn toggle(&mut self) -> FormPhase {
        match self.phase {
            FormPhase::Closed => {
                self.open();
            }
            FormPhase::Editing => {
                self.cancel();
            }
            FormPhase::Submitting => {}
        }
        self.phase
    }

    pub fn edit(&mut self, draft: D) -> bool {
        if self.phase != FormPhase::Editing {
            return false;
        }
        self.draft = draft;
        true
    }

    pub fn begin_submit(&mut self) -> bool {
        if self.phase != FormPhase::Editing {
            return false;
        }
        self.phase = FormPhase::Submitting;
        true
    }

    pub fn finish_success(&mut self) {
        self.phase = FormPhase::Closed;
        self.draft = D::default();
    }

    /// Back to editing with the draft intact.
    pub fn finish_failure(&mut self) {
        self.phase = FormPhase::Editing;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::forms::ProductDraft;

    fn widget() -> ProductDraft {
        ProductDraft {
            name: "Widget".into(),
            price: "9.99".into(),
            category: "Tools".into(),
        }
    }

    #[test]
    fn success_closes_and_clears() {
        let mut form = FormMachine::<ProductDraft>::new();
        assert!(form.open());
        assert!(form.edit(widget()));
        assert!(form.begin_submit());
        assert_eq!(form.phase(), FormPhase::Submitting);

        form.finish_success();
        assert_eq!(form.phase(), FormPhase::Closed);
        assert_eq!(form.draft(), &ProductDraft::default());
    }

    #[test]
    fn failure_keeps_draft_for_retry() {
        let mut form = FormMachine::<ProductDraft>::new();
        form.open();
        form.edit(widget());
        form.begin_submit();

        form.finish_failure();
        assert_eq!(form.phase(), FormPhase::Editing);
        assert_eq!(form.draft(), &widget());
    }

    #[test]
    fn cancel_discards_draft() {
        let mut form = FormMachine::<ProductDraft>::new();
        form.open();
        form.edit(widget());
        assert!(form.cancel());
        assert!(!form.is_open());

        form.open();
        assert_eq!(form.draft(), &ProductDraft::default());
    }

    #[test]
    fn closed_and_submitting_forms_reject_submit() {
        let mut form = FormMachine::<ProductDraft>::new();
        assert!(!form.begin_submit());
        assert!(!form.edit(widget()));

        form.open();
        form.begin_submit();
        assert!(!form.begin_submit());
        assert!(!form.cancel());
        assert_eq!(form.toggle(), FormPhase::Submitting);
    }

    #[test]
    fn toggle_alternates() {
        let mut form = FormMachine::<ProductDraft>::new();
        assert_eq!(form.toggle(), FormPhase::Editing);
        assert_eq!(form.toggle(), FormPhase::Closed);
    }
}
