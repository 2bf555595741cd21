//! Ishikawa (fishbone) editor — an effect with categorized, nested causes.
//!
//! DESIGN
//! ======
//! Categories form the bones of the fishbone; each holds a tree of causes
//! where any cause may carry sub-causes to arbitrary depth. Cause ids are
//! unique across the whole diagram, so lookups search every category.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{EditorError, require_text};

/// The classic "6M" bones.
pub const DEFAULT_CATEGORIES: [&str; 6] = ["Method", "Machine", "Manpower", "Material", "Measurement", "Environment"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cause {
    pub id: Uuid,
    pub text: String,
    #[serde(default)]
    pub likely: bool,
    #[serde(default)]
    pub sub_causes: Vec<Cause>,
}

impl Cause {
    fn new(text: String) -> Self {
        Self { id: Uuid::new_v4(), text, likely: false, sub_causes: Vec::new() }
    }

    fn count(&self) -> usize {
        1 + self.sub_causes.iter().map(Cause::count).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CauseCategory {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub causes: Vec<Cause>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IshikawaDiagram {
    #[serde(default)]
    pub effect: String,
    #[serde(default)]
    pub categories: Vec<CauseCategory>,
}

fn find_cause_mut(causes: &mut [Cause], id: Uuid) -> Option<&mut Cause> {
    for cause in causes {
        if cause.id == id {
            return Some(cause);
        }
        if let Some(found) = find_cause_mut(&mut cause.sub_causes, id) {
            return Some(found);
        }
    }
    None
}

/// Remove the cause with `id` from `causes` or any nested level.
fn remove_cause_in(causes: &mut Vec<Cause>, id: Uuid) -> Option<Cause> {
    if let Some(pos) = causes.iter().position(|c| c.id == id) {
        return Some(causes.remove(pos));
    }
    causes.iter_mut().find_map(|c| remove_cause_in(&mut c.sub_causes, id))
}

impl IshikawaDiagram {
    /// A diagram pre-populated with the six default categories.
    #[must_use]
    pub fn with_default_categories() -> Self {
        Self {
            effect: String::new(),
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|name| CauseCategory { id: Uuid::new_v4(), name: (*name).to_owned(), causes: Vec::new() })
                .collect(),
        }
    }

    pub fn set_effect(&mut self, text: &str) -> Result<(), EditorError> {
        self.effect = require_text(text, "effect")?;
        Ok(())
    }

    fn name_taken(&self, name: &str, except: Option<Uuid>) -> bool {
        self.categories
            .iter()
            .any(|c| Some(c.id) != except && c.name.eq_ignore_ascii_case(name))
    }

    fn category_mut(&mut self, id: Uuid) -> Result<&mut CauseCategory, EditorError> {
        self.categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(EditorError::NotFound(id))
    }

    pub fn add_category(&mut self, name: &str) -> Result<&CauseCategory, EditorError> {
        let name = require_text(name, "category")?;
        if self.name_taken(&name, None) {
            return Err(EditorError::DuplicateCategory(name));
        }
        self.categories.push(CauseCategory { id: Uuid::new_v4(), name, causes: Vec::new() });
        Ok(&self.categories[self.categories.len() - 1])
    }

    pub fn rename_category(&mut self, id: Uuid, name: &str) -> Result<(), EditorError> {
        let name = require_text(name, "category")?;
        if self.name_taken(&name, Some(id)) {
            return Err(EditorError::DuplicateCategory(name));
        }
        self.category_mut(id)?.name = name;
        Ok(())
    }

    /// Drop a category along with all of its causes.
    pub fn remove_category(&mut self, id: Uuid) -> Result<CauseCategory, EditorError> {
        let pos = self
            .categories
            .iter()
            .position(|c| c.id == id)
            .ok_or(EditorError::NotFound(id))?;
        Ok(self.categories.remove(pos))
    }

    /// Add a cause to a category, or as a sub-cause of `parent_cause` within it.
    ///
    /// # Errors
    ///
    /// `NotFound` when the category, or the parent cause inside that category,
    /// does not exist.
    pub fn add_cause(
        &mut self,
        category_id: Uuid,
        parent_cause: Option<Uuid>,
        text: &str,
    ) -> Result<Uuid, EditorError> {
        let text = require_text(text, "cause")?;
        let category = self.category_mut(category_id)?;
        let cause = Cause::new(text);
        let id = cause.id;
        match parent_cause {
            None => category.causes.push(cause),
            Some(parent) => find_cause_mut(&mut category.causes, parent)
                .ok_or(EditorError::NotFound(parent))?
                .sub_causes
                .push(cause),
        }
        Ok(id)
    }

    fn cause_mut(&mut self, id: Uuid) -> Result<&mut Cause, EditorError> {
        self.categories
            .iter_mut()
            .find_map(|c| find_cause_mut(&mut c.causes, id))
            .ok_or(EditorError::NotFound(id))
    }

    pub fn update_cause(&mut self, id: Uuid, text: &str) -> Result<(), EditorError> {
        let text = require_text(text, "cause")?;
        self.cause_mut(id)?.text = text;
        Ok(())
    }

    pub fn set_likely(&mut self, id: Uuid, likely: bool) -> Result<(), EditorError> {
        self.cause_mut(id)?.likely = likely;
        Ok(())
    }

    /// Remove a cause and its sub-causes. Returns how many causes went away.
    pub fn remove_cause(&mut self, id: Uuid) -> Result<usize, EditorError> {
        self.categories
            .iter_mut()
            .find_map(|c| remove_cause_in(&mut c.causes, id))
            .map(|removed| removed.count())
            .ok_or(EditorError::NotFound(id))
    }

    #[must_use]
    pub fn total_causes(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|c| c.causes.iter())
            .map(Cause::count)
            .sum()
    }
}

// =============================================================================
// ANALYSIS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category_id: Uuid,
    pub name: String,
    pub causes: usize,
}

/// A cause flagged as likely, with the category and the chain of parent causes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikelyCause {
    pub id: Uuid,
    pub category: String,
    pub path: Vec<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IshikawaAnalysis {
    pub effect: String,
    pub total_causes: usize,
    pub categories: Vec<CategoryCount>,
    pub likely_causes: Vec<LikelyCause>,
}

fn collect_likely(category: &str, causes: &[Cause], path: &mut Vec<String>, out: &mut Vec<LikelyCause>) {
    for cause in causes {
        if cause.likely {
            out.push(LikelyCause {
                id: cause.id,
                category: category.to_owned(),
                path: path.clone(),
                text: cause.text.clone(),
            });
        }
        path.push(cause.text.clone());
        collect_likely(category, &cause.sub_causes, path, out);
        path.pop();
    }
}

impl IshikawaDiagram {
    #[must_use]
    pub fn category_counts(&self) -> Vec<CategoryCount> {
        self.categories
            .iter()
            .map(|c| CategoryCount {
                category_id: c.id,
                name: c.name.clone(),
                causes: c.causes.iter().map(Cause::count).sum(),
            })
            .collect()
    }

    #[must_use]
    pub fn likely_causes(&self) -> Vec<LikelyCause> {
        let mut out = Vec::new();
        for category in &self.categories {
            collect_likely(&category.name, &category.causes, &mut Vec::new(), &mut out);
        }
        out
    }

    #[must_use]
    pub fn analyze(&self) -> IshikawaAnalysis {
        IshikawaAnalysis {
            effect: self.effect.clone(),
            total_causes: self.total_causes(),
            categories: self.category_counts(),
            likely_causes: self.likely_causes(),
        }
    }
}

#[cfg(test)]
#[path = "ishikawa_test.rs"]
mod tests;
