//! Ordered, index-addressed list of formula fields edited by the designer

use crate::error::{CaljarError, CaljarResult};
use crate::types::{FormulaField, Status};

/// Which half of a formula field an edit replaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormulaAttribute {
    Label,
    Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaFieldSet {
    formulas: Vec<FormulaField>,
    read_only: bool,
}

impl FormulaFieldSet {
    /// An editable set
    pub fn new(formulas: Vec<FormulaField>) -> Self {
        Self {
            formulas,
            read_only: false,
        }
    }

    /// A set that rejects every mutation
    pub fn read_only(formulas: Vec<FormulaField>) -> Self {
        Self {
            formulas,
            read_only: true,
        }
    }

    /// Editable only while the template is in a design-editable status
    pub fn for_status(formulas: Vec<FormulaField>, status: Status) -> Self {
        Self {
            formulas,
            read_only: !status.is_design_editable(),
        }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn formulas(&self) -> &[FormulaField] {
        &self.formulas
    }

    pub fn into_formulas(self) -> Vec<FormulaField> {
        self.formulas
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    fn ensure_editable(&self, action: &str) -> CaljarResult<()> {
        if self.read_only {
            Err(CaljarError::ReadOnly(format!(
                "cannot {} formulas of a template that is not in draft",
                action
            )))
        } else {
            Ok(())
        }
    }

    fn get_mut(&mut self, index: usize) -> CaljarResult<&mut FormulaField> {
        let len = self.formulas.len();
        self.formulas
            .get_mut(index)
            .ok_or(CaljarError::IndexOutOfRange {
                what: "formulas",
                index,
                len,
            })
    }

    /// Append an empty formula with a fresh id; returns its index
    pub fn add(&mut self) -> CaljarResult<usize> {
        self.ensure_editable("add")?;
        self.formulas.push(FormulaField::new("", ""));
        Ok(self.formulas.len() - 1)
    }

    /// Replace exactly one attribute of the formula at `index`
    pub fn update(
        &mut self,
        index: usize,
        attribute: FormulaAttribute,
        text: impl Into<String>,
    ) -> CaljarResult<()> {
        self.ensure_editable("edit")?;
        let formula = self.get_mut(index)?;
        match attribute {
            FormulaAttribute::Label => formula.label = text.into(),
            FormulaAttribute::Value => formula.value = text.into(),
        }
        Ok(())
    }

    /// Delete the formula at `index`; later formulas move down by one
    pub fn remove(&mut self, index: usize) -> CaljarResult<FormulaField> {
        self.ensure_editable("remove")?;
        if index >= self.formulas.len() {
            return Err(CaljarError::IndexOutOfRange {
                what: "formulas",
                index,
                len: self.formulas.len(),
            });
        }
        Ok(self.formulas.remove(index))
    }

    /// Append palette text (a cell identifier or function template) to the
    /// formula at `index`
    pub fn insert_text(&mut self, index: usize, text: &str) -> CaljarResult<()> {
        self.ensure_editable("edit")?;
        self.get_mut(index)?.value.push_str(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FormulaFieldSet {
        FormulaFieldSet::new(vec![
            FormulaField::new("Density", "=A1/A2"),
            FormulaField::new("Yield", "=A3*100"),
            FormulaField::new("Loss", "=A1-A3"),
        ])
    }

    #[test]
    fn test_add_appends_blank_with_fresh_id() {
        let mut set = sample();
        let index = set.add().unwrap();
        assert_eq!(index, 3);
        let added = &set.formulas()[3];
        assert_eq!(added.label, "");
        assert_eq!(added.value, "");
        assert!(set.formulas()[..3].iter().all(|f| f.id != added.id));
    }

    #[test]
    fn test_update_touches_one_attribute() {
        let mut set = sample();
        let before = set.clone();
        set.update(1, FormulaAttribute::Label, "Recovery").unwrap();

        assert_eq!(set.formulas()[1].label, "Recovery");
        assert_eq!(set.formulas()[1].value, before.formulas()[1].value);
        assert_eq!(set.formulas()[1].id, before.formulas()[1].id);
        assert_eq!(set.formulas()[0], before.formulas()[0]);
        assert_eq!(set.formulas()[2], before.formulas()[2]);

        set.update(1, FormulaAttribute::Value, "=A3").unwrap();
        assert_eq!(set.formulas()[1].value, "=A3");
    }

    #[test]
    fn test_remove_shifts_later_entries() {
        let mut set = sample();
        let removed = set.remove(0).unwrap();
        assert_eq!(removed.label, "Density");
        let labels: Vec<&str> = set.formulas().iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["Yield", "Loss"]);
    }

    #[test]
    fn test_insert_text_appends() {
        let mut set = sample();
        set.insert_text(0, " + SQRT(A4)").unwrap();
        assert_eq!(set.formulas()[0].value, "=A1/A2 + SQRT(A4)");
    }

    #[test]
    fn test_out_of_range_index() {
        let mut set = sample();
        assert!(matches!(
            set.update(3, FormulaAttribute::Label, "x"),
            Err(CaljarError::IndexOutOfRange { index: 3, len: 3, .. })
        ));
        assert!(matches!(
            set.remove(7),
            Err(CaljarError::IndexOutOfRange { .. })
        ));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_read_only_rejects_every_mutation() {
        let mut set = FormulaFieldSet::read_only(sample().into_formulas());
        assert!(matches!(set.add(), Err(CaljarError::ReadOnly(_))));
        assert!(matches!(
            set.update(0, FormulaAttribute::Value, "1"),
            Err(CaljarError::ReadOnly(_))
        ));
        assert!(matches!(set.remove(0), Err(CaljarError::ReadOnly(_))));
        assert!(matches!(set.insert_text(0, "A1"), Err(CaljarError::ReadOnly(_))));
        assert_eq!(set.len(), 3);
        assert_eq!(set.formulas()[0].value, "=A1/A2");
    }

    #[test]
    fn test_for_status() {
        assert!(!FormulaFieldSet::for_status(vec![], Status::Draft).is_read_only());
        assert!(!FormulaFieldSet::for_status(vec![], Status::Rejected).is_read_only());
        assert!(FormulaFieldSet::for_status(vec![], Status::Approved).is_read_only());
        assert!(FormulaFieldSet::for_status(vec![], Status::Verified).is_read_only());
    }
}
