//! Which checklist sections and items a project shows and counts.
//!
//! Full projects are scoped by section (`test_scope`), ad-hoc projects by an
//! explicit item whitelist (`target_items`). For full projects an absent
//! `test_scope` means every section is in scope while an empty one means
//! none is.

use crate::models::{ChecklistItem, ProjectInfo, ProjectType, Section, StandardDefinition};

#[derive(Debug, Clone, Copy)]
pub struct VisibilityResolver<'a> {
    /// `None` when no project is open; nothing is visible then
    info: Option<&'a ProjectInfo>,
    standard: &'a StandardDefinition,
}

impl<'a> VisibilityResolver<'a> {
    pub fn new(info: Option<&'a ProjectInfo>, standard: &'a StandardDefinition) -> Self {
        Self { info, standard }
    }

    pub fn is_section_visible(&self, section_id: &str) -> bool {
        let Some(info) = self.info else {
            return false;
        };

        match info.project_type {
            ProjectType::AdHoc => {
                let whitelist = whitelist(info);
                self.standard.section(section_id).is_some_and(|section| {
                    section.items.iter().any(|item| {
                        item.uid
                            .as_ref()
                            .is_some_and(|uid| whitelist.contains(uid))
                    })
                })
            }
            ProjectType::Full => match &info.test_scope {
                None => true,
                Some(scope) => scope.iter().any(|id| id == section_id),
            },
        }
    }

    /// `identifier` may be an item's UID or its human-readable ID.
    pub fn is_item_visible(&self, identifier: &str) -> bool {
        let Some(info) = self.info else {
            return false;
        };

        match info.project_type {
            ProjectType::AdHoc => whitelist(info).iter().any(|uid| uid == identifier),
            ProjectType::Full => match &info.test_scope {
                None => true,
                Some(scope) => self
                    .section_of(identifier)
                    .is_some_and(|section_id| scope.iter().any(|id| id == section_id)),
            },
        }
    }

    /// Section containing the first item whose `id` or `uid` matches.
    pub fn section_of(&self, identifier: &str) -> Option<&'a str> {
        self.standard
            .find_item(identifier)
            .map(|(section, _)| section.section_id.as_str())
    }

    pub fn visible_sections(&self) -> Vec<&'a Section> {
        self.standard
            .test_standards
            .iter()
            .filter(|section| self.is_section_visible(&section.section_id))
            .collect()
    }

    /// Visible items in definition order, paired with their section.
    pub fn visible_items(&self) -> Vec<(&'a Section, &'a ChecklistItem)> {
        self.standard
            .items()
            .filter(|(_, item)| self.is_item_visible(item.key()))
            .collect()
    }
}

fn whitelist(info: &ProjectInfo) -> &[String] {
    info.target_items.as_deref().unwrap_or(&[])
}
