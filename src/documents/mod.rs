mod dto;
pub mod model;
pub mod poller;
pub mod services;
pub mod upload;
pub mod view;

pub use poller::{DocumentPoller, PollEvent};
pub use services::{analyze, delete_document, download, get_document, list_documents};
pub use upload::UploadFile;
pub use view::DocumentView;
