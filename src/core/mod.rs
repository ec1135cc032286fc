pub mod artifact;
pub mod classification;
pub mod ingestion;

pub use crate::domain::model::{ClassificationResult, NewTicket, TicketRecord};
pub use crate::domain::ports::{ArtifactLoader, DepartmentModel, TicketStore};
pub use crate::utils::error::Result;
