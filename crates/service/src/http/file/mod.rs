//! File access routes: `GET|HEAD {site_path}{name}` (also under `selif/`)
//!  and the `POST {site_path}{name}` unlock form.

pub mod client;
pub mod cookies;
pub mod serve;
pub mod site;
pub mod unlock;

/// The page a file's unlock form posts to, and hotlinks are sent to.
pub fn canonical_path(site_path: &str, name: &str) -> String {
    format!("{}{}", site_path, name)
}
