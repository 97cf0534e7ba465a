use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use anyhow::Context;
use tracing::{
  debug,
  trace
};

use crate::error::ParseValueError;

/// Records that can be narrowed by
/// free-text search, a status set and
/// a secondary category set.
pub trait Filterable {
  type Status: Ord
    + Copy
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = ParseValueError>;
  type Category: Ord
    + Copy
    + fmt::Debug
    + fmt::Display
    + FromStr<Err = ParseValueError>;

  /// Term key used for the category
  /// set, e.g. `industry` or
  /// `priority`.
  const CATEGORY_KEY: &'static str;

  fn search_fields(
    &self
  ) -> Vec<&str>;

  fn status(&self) -> Self::Status;

  fn category(&self) -> Self::Category;
}

pub type FilterFor<T> = FilterState<
  <T as Filterable>::Status,
  <T as Filterable>::Category
>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState<S, C> {
  search:     String,
  statuses:   BTreeSet<S>,
  categories: BTreeSet<C>
}

impl<S: Ord, C: Ord> Default
  for FilterState<S, C>
{
  fn default() -> Self {
    Self {
      search:     String::new(),
      statuses:   BTreeSet::new(),
      categories: BTreeSet::new()
    }
  }
}

impl<S, C> FilterState<S, C>
where
  S: Ord + Copy + fmt::Debug,
  C: Ord + Copy + fmt::Debug
{
  pub fn new() -> Self {
    Self::default()
  }

  pub fn search(&self) -> &str {
    &self.search
  }

  pub fn statuses(
    &self
  ) -> &BTreeSet<S> {
    &self.statuses
  }

  pub fn categories(
    &self
  ) -> &BTreeSet<C> {
    &self.categories
  }

  pub fn set_search(
    &mut self,
    text: impl Into<String>
  ) {
    self.search = text.into();
  }

  /// Checkbox semantics: checking adds
  /// the value, unchecking removes it.
  pub fn toggle_status(
    &mut self,
    status: S,
    checked: bool
  ) {
    if checked {
      self.statuses.insert(status);
    } else {
      self.statuses.remove(&status);
    }
  }

  pub fn toggle_category(
    &mut self,
    category: C,
    checked: bool
  ) {
    if checked {
      self.categories.insert(category);
    } else {
      self.categories.remove(&category);
    }
  }

  pub fn clear(&mut self) {
    self.search.clear();
    self.statuses.clear();
    self.categories.clear();
  }

  pub fn is_empty(&self) -> bool {
    self.search.is_empty()
      && self.statuses.is_empty()
      && self.categories.is_empty()
  }

  pub fn matches<T>(
    &self,
    entity: &T
  ) -> bool
  where
    T: Filterable<
        Status = S,
        Category = C
      >
  {
    let search_ok =
      matches_search(
        &self.search,
        &entity.search_fields()
      );
    let status_ok = self
      .statuses
      .is_empty()
      || self
        .statuses
        .contains(&entity.status());
    let category_ok = self
      .categories
      .is_empty()
      || self
        .categories
        .contains(&entity.category());

    trace!(
      search_ok,
      status_ok,
      category_ok,
      "filter evaluation"
    );
    search_ok && status_ok && category_ok
  }

  /// Stable filter over `entities`;
  /// relative order is preserved.
  #[tracing::instrument(skip_all, fields(total = entities.len()))]
  pub fn apply<'a, T>(
    &self,
    entities: &'a [T]
  ) -> Vec<&'a T>
  where
    T: Filterable<
        Status = S,
        Category = C
      >
  {
    let out: Vec<&T> = entities
      .iter()
      .filter(|entity| {
        self.matches(*entity)
      })
      .collect();
    debug!(
      shown = out.len(),
      "filtered entities"
    );
    out
  }
}

/// Owned variant of
/// [`FilterState::apply`].
pub fn filter_entities<T>(
  entities: &[T],
  state: &FilterFor<T>
) -> Vec<T>
where
  T: Filterable + Clone
{
  state
    .apply(entities)
    .into_iter()
    .cloned()
    .collect()
}

fn matches_search(
  search: &str,
  fields: &[&str]
) -> bool {
  if search.is_empty() {
    return true;
  }
  let needle = search.to_lowercase();
  fields.iter().any(|field| {
    field
      .to_lowercase()
      .contains(&needle)
  })
}

/// Builds filter state from command
/// terms: `status:a,b`,
/// `<category-key>:x,y`, and free
/// words that form the search text.
#[tracing::instrument(skip(terms))]
pub fn parse_terms<T: Filterable>(
  terms: &[String]
) -> anyhow::Result<FilterFor<T>> {
  let mut state = FilterFor::<T>::new();
  let mut words = Vec::new();

  for term in terms {
    if let Some((key, values)) =
      term.split_once(':')
    {
      let key = key.to_ascii_lowercase();
      if key == "status" {
        for raw in split_values(values) {
          let status = raw
            .parse::<T::Status>()
            .with_context(|| {
              format!(
                "bad filter term {term}"
              )
            })?;
          state
            .toggle_status(status, true);
        }
        continue;
      }
      if key == T::CATEGORY_KEY {
        for raw in split_values(values) {
          let category = raw
            .parse::<T::Category>()
            .with_context(|| {
              format!(
                "bad filter term {term}"
              )
            })?;
          state.toggle_category(
            category, true
          );
        }
        continue;
      }
    }
    words.push(term.as_str());
  }

  state.set_search(words.join(" "));

  debug!(
    search = %state.search(),
    statuses = ?state.statuses(),
    categories = ?state.categories(),
    "parsed filter terms"
  );
  Ok(state)
}

fn split_values(
  raw: &str
) -> impl Iterator<Item = &str> {
  raw
    .split(',')
    .map(str::trim)
    .filter(|v| !v.is_empty())
}
