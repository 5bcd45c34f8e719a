use serde::Serialize;

use crate::sim::catalog::{BodyDescriptor, Fact};

/// Which body, if any, the info panel is showing. Holds a catalog index.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    Idle,
    Selected(usize),
}

/// Emitted whenever the selection actually changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionChange {
    pub previous: Option<usize>,
    pub current: Option<usize>,
}

impl Selection {
    pub fn body(&self) -> Option<usize> {
        match *self {
            Selection::Idle => None,
            Selection::Selected(index) => Some(index),
        }
    }

    fn transition(&mut self, next: Selection) -> Option<SelectionChange> {
        if *self == next {
            return None;
        }
        let change = SelectionChange { previous: self.body(), current: next.body() };
        *self = next;
        Some(change)
    }

    /// Apply a pick result. A miss leaves the selection as it is.
    pub fn pick(&mut self, hit: Option<usize>) -> Option<SelectionChange> {
        match hit {
            Some(index) => self.transition(Selection::Selected(index)),
            None => None,
        }
    }

    pub fn clear(&mut self) -> Option<SelectionChange> {
        self.transition(Selection::Idle)
    }
}

/// What the view needs to fill the info panel for a body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SelectionInfo {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub color: String,
    pub description: String,
    pub facts: Vec<Fact>,
}

impl SelectionInfo {
    pub fn from_descriptor(body: &BodyDescriptor) -> Self {
        SelectionInfo {
            id: body.id.clone(),
            name: body.display_name.clone(),
            kind: body.kind().label(),
            color: body.css_color(),
            description: body.description.clone(),
            facts: body.facts(),
        }
    }
}
