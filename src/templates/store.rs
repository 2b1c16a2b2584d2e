//! Step entity store operations on a [`Template`].
//!
//! Steps are kept sorted by `order`, and `order` is renumbered 0..N-1
//! after every structural change, so positions never have gaps.

use tracing::debug;

use super::schema::{Step, StepContent, StepId, StepType, Template};
use crate::error::{EditorError, EditorResult};

impl Template {
    pub fn get_step(&self, step_id: &StepId) -> EditorResult<&Step> {
        self.steps
            .iter()
            .find(|s| &s.id == step_id)
            .ok_or_else(|| EditorError::StepNotFound(step_id.clone()))
    }

    /// Position of a step in the workflow
    pub fn step_index(&self, step_id: &StepId) -> EditorResult<usize> {
        self.steps
            .iter()
            .position(|s| &s.id == step_id)
            .ok_or_else(|| EditorError::StepNotFound(step_id.clone()))
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Replace a step's content wholesale; `order` and `active` are kept.
    ///
    /// The content variant must match the step's type.
    pub fn upsert_step_content(
        &mut self,
        step_id: &StepId,
        content: StepContent,
    ) -> EditorResult<&Step> {
        let index = self.step_index(step_id)?;
        let expected = self.steps[index].step_type();
        if content.step_type() != expected {
            return Err(EditorError::ContentMismatch {
                expected,
                found: content.step_type(),
            });
        }

        self.steps[index].content = content;
        self.touch();
        debug!(step_id = %step_id, "Stored step content");
        Ok(&self.steps[index])
    }

    /// Insert a new, active, empty step at `at_index` (0..=len).
    pub fn insert_step(&mut self, step_type: StepType, at_index: usize) -> EditorResult<&Step> {
        if at_index > self.steps.len() {
            return Err(EditorError::InvalidIndex {
                index: at_index,
                len: self.steps.len(),
            });
        }

        let step = Step {
            id: StepId::generate(),
            active: true,
            order: at_index,
            content: StepContent::empty(step_type),
        };
        debug!(step_id = %step.id, %step_type, at_index, "Inserted step");

        self.steps.insert(at_index, step);
        self.renumber();
        self.touch();
        Ok(&self.steps[at_index])
    }

    /// Append a new step at the end of the workflow
    pub fn push_step(&mut self, step_type: StepType) -> EditorResult<&Step> {
        self.insert_step(step_type, self.steps.len())
    }

    /// Remove a step and close the gap it leaves.
    pub fn delete_step(&mut self, step_id: &StepId) -> EditorResult<Step> {
        let index = self.step_index(step_id)?;
        let removed = self.steps.remove(index);
        self.renumber();
        self.touch();
        debug!(step_id = %step_id, remaining = self.steps.len(), "Deleted step");
        Ok(removed)
    }

    pub fn set_step_active(&mut self, step_id: &StepId, active: bool) -> EditorResult<()> {
        let index = self.step_index(step_id)?;
        self.steps[index].active = active;
        self.touch();
        Ok(())
    }

    /// Move a step to `new_index` (0..len), shifting the steps in between.
    pub fn reorder_step(&mut self, step_id: &StepId, new_index: usize) -> EditorResult<()> {
        if new_index >= self.steps.len() {
            return Err(EditorError::InvalidIndex {
                index: new_index,
                len: self.steps.len(),
            });
        }

        let index = self.step_index(step_id)?;
        let step = self.steps.remove(index);
        self.steps.insert(new_index, step);
        self.renumber();
        self.touch();
        Ok(())
    }

    /// Sort by stored order and renumber contiguously.
    ///
    /// Used after loading a template from a collaborator whose `order`
    /// values may not be dense.
    pub fn normalize_order(&mut self) {
        self.steps.sort_by_key(|s| s.order);
        self.renumber();
    }

    fn renumber(&mut self) {
        for (order, step) in self.steps.iter_mut().enumerate() {
            step.order = order;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::schema::{Environment, TextContent};

    fn template_with(types: &[StepType]) -> Template {
        let mut template = Template::new("Store", Environment::Development);
        for step_type in types {
            template.push_step(*step_type).unwrap();
        }
        template
    }

    fn orders(template: &Template) -> Vec<usize> {
        template.steps.iter().map(|s| s.order).collect()
    }

    fn types(template: &Template) -> Vec<StepType> {
        template.steps.iter().map(|s| s.step_type()).collect()
    }

    #[test]
    fn test_insert_shifts_following_steps() {
        let mut template = template_with(&[StepType::InApp, StepType::Email]);
        let sms = template.insert_step(StepType::Sms, 1).unwrap().id.clone();

        assert_eq!(
            types(&template),
            vec![StepType::InApp, StepType::Sms, StepType::Email]
        );
        assert_eq!(orders(&template), vec![0, 1, 2]);
        assert_eq!(template.get_step(&sms).unwrap().order, 1);
        assert!(template.get_step(&sms).unwrap().active);
    }

    #[test]
    fn test_insert_out_of_bounds_is_rejected() {
        let mut template = template_with(&[StepType::InApp]);
        let err = template.insert_step(StepType::Sms, 2).unwrap_err();
        assert_eq!(err, EditorError::InvalidIndex { index: 2, len: 1 });
        assert_eq!(template.step_count(), 1);
    }

    #[test]
    fn test_delete_recompacts_order() {
        let mut template =
            template_with(&[StepType::InApp, StepType::Email, StepType::Sms, StepType::Push]);
        let email = template.steps[1].id.clone();

        template.delete_step(&email).unwrap();

        assert_eq!(template.step_count(), 3);
        assert_eq!(orders(&template), vec![0, 1, 2]);
        assert_eq!(
            types(&template),
            vec![StepType::InApp, StepType::Sms, StepType::Push]
        );
        assert!(matches!(
            template.get_step(&email),
            Err(EditorError::StepNotFound(_))
        ));
    }

    #[test]
    fn test_delete_unknown_step() {
        let mut template = template_with(&[StepType::InApp]);
        let err = template.delete_step(&StepId("missing".into())).unwrap_err();
        assert_eq!(err, EditorError::StepNotFound(StepId("missing".into())));
        assert_eq!(template.step_count(), 1);
    }

    #[test]
    fn test_reorder() {
        let mut template = template_with(&[StepType::InApp, StepType::Email, StepType::Sms]);
        let sms = template.steps[2].id.clone();

        template.reorder_step(&sms, 0).unwrap();
        assert_eq!(
            types(&template),
            vec![StepType::Sms, StepType::InApp, StepType::Email]
        );
        assert_eq!(orders(&template), vec![0, 1, 2]);

        let err = template.reorder_step(&sms, 3).unwrap_err();
        assert_eq!(err, EditorError::InvalidIndex { index: 3, len: 3 });
        assert_eq!(template.steps[0].id, sms);
    }

    #[test]
    fn test_upsert_preserves_order_and_active() {
        let mut template = template_with(&[StepType::InApp, StepType::Sms]);
        let sms = template.steps[1].id.clone();
        template.set_step_active(&sms, false).unwrap();

        let content = StepContent::Sms(TextContent {
            text: "Your code is {{code}}".to_string(),
        });
        let step = template.upsert_step_content(&sms, content.clone()).unwrap();

        assert_eq!(step.order, 1);
        assert!(!step.active);
        assert_eq!(step.content, content);
    }

    #[test]
    fn test_upsert_rejects_other_step_type() {
        let mut template = template_with(&[StepType::Email]);
        let email = template.steps[0].id.clone();

        let err = template
            .upsert_step_content(&email, StepContent::empty(StepType::Sms))
            .unwrap_err();
        assert_eq!(
            err,
            EditorError::ContentMismatch {
                expected: StepType::Email,
                found: StepType::Sms
            }
        );
    }

    #[test]
    fn test_normalize_order_closes_gaps() {
        let mut template = template_with(&[StepType::InApp, StepType::Email]);
        template.steps[0].order = 7;
        template.steps[1].order = 3;

        template.normalize_order();

        assert_eq!(types(&template), vec![StepType::Email, StepType::InApp]);
        assert_eq!(orders(&template), vec![0, 1]);
    }
}
