use crate::{
    form::{
        form_classifier::is_authentication_form,
        form_model::{FieldMap, PageSnapshot},
    },
    persist::persistence::extract,
};

pub mod cli;
pub mod error;
pub mod form;
pub mod page;
pub mod persist;
pub mod scenario;
pub mod storage;
pub mod trace;
pub mod tracker;

pub use error::{RecallError, Result};

/// Indices of the forms on a page that may be saved and restored.
pub fn eligible_forms(page: &PageSnapshot) -> Vec<usize> {
    page.forms
        .iter()
        .enumerate()
        .filter(|(_, form)| !is_authentication_form(form))
        .map(|(index, _)| index)
        .collect()
}

/// Storage key and extracted values of every eligible form, without
/// touching any store.
pub fn preview_page(page: &PageSnapshot) -> Result<Vec<(String, FieldMap)>> {
    let location = page.location()?;

    Ok(eligible_forms(page)
        .into_iter()
        .map(|index| {
            (
                location.record(index).storage_key(),
                extract(&page.forms[index]),
            )
        })
        .collect())
}
