//! Turning command-line test patterns into a selection mask.

use tracing::debug;

use crate::device::ComputeDevice;
use crate::error::SelectionError;
use crate::registry::TestRegistry;

/// One flag per registered test, in registry order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionMask {
    selected: Vec<bool>,
}

impl SelectionMask {
    pub fn all(len: usize) -> Self {
        Self { selected: vec![true; len] }
    }

    pub fn none(len: usize) -> Self {
        Self { selected: vec![false; len] }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.get(index).copied().unwrap_or(false)
    }

    pub fn count_selected(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    pub fn selected_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().enumerate().filter_map(|(i, s)| s.then_some(i))
    }

    fn set(&mut self, index: usize, value: bool) {
        self.selected[index] = value;
    }
}

/// A test name, a `prefix*` wildcard, or `all`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestPattern {
    All,
    Exact(String),
    Prefix(String),
}

impl TestPattern {
    pub fn parse(raw: &str) -> Result<Self, SelectionError> {
        if raw == "all" {
            return Ok(TestPattern::All);
        }
        match raw.strip_suffix('*') {
            Some(prefix) if !prefix.contains('*') => Ok(TestPattern::Prefix(prefix.to_string())),
            Some(_) => Err(SelectionError::InvalidPattern(raw.to_string())),
            None if raw.contains('*') => Err(SelectionError::InvalidPattern(raw.to_string())),
            None => Ok(TestPattern::Exact(raw.to_string())),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            TestPattern::All => true,
            TestPattern::Exact(exact) => name == exact,
            TestPattern::Prefix(prefix) => name.starts_with(prefix.as_str()),
        }
    }
}

/// Resolve include and exclude patterns against `registry`.
///
/// With no includes every test is selected, unimplemented ones included (the
/// dispatcher skips those). Includes are applied in order and `all` ends
/// include processing. Explicitly naming a test twice, naming an
/// unimplemented test, or a pattern that matches nothing is an error.
/// Excludes are applied afterwards and must each match at least one test.
pub fn select_tests<D: ComputeDevice>(
    registry: &TestRegistry<D>,
    includes: &[String],
    excludes: &[String],
) -> Result<SelectionMask, SelectionError> {
    let mut mask = if includes.is_empty() {
        SelectionMask::all(registry.len())
    } else {
        include(registry, includes)?
    };

    for raw in excludes {
        let pattern = TestPattern::parse(raw)?;
        let mut matched = false;
        for (index, test) in registry.iter().enumerate() {
            if pattern.matches(test.name()) {
                matched = true;
                mask.set(index, false);
            }
        }
        if !matched {
            return Err(SelectionError::NoMatch(raw.clone()));
        }
        debug!("excluded tests matching '{raw}'");
    }

    debug!("{} of {} tests selected", mask.count_selected(), mask.len());
    Ok(mask)
}

fn include<D: ComputeDevice>(
    registry: &TestRegistry<D>,
    includes: &[String],
) -> Result<SelectionMask, SelectionError> {
    let mut mask = SelectionMask::none(registry.len());
    for raw in includes {
        let pattern = TestPattern::parse(raw)?;
        if pattern == TestPattern::All {
            return Ok(SelectionMask::all(registry.len()));
        }

        let mut matched = false;
        for (index, test) in registry.iter().enumerate() {
            if !pattern.matches(test.name()) {
                continue;
            }
            matched = true;
            if mask.is_selected(index) {
                return Err(SelectionError::AlreadySelected(test.name().to_string()));
            }
            if !test.is_implemented() {
                return Err(SelectionError::MissingImplementation(test.name().to_string()));
            }
            mask.set(index, true);
        }
        if !matched {
            return Err(SelectionError::NoMatch(raw.clone()));
        }
    }
    Ok(mask)
}
