//! Output rendering for every command.

pub mod generator;

pub use generator::{
    generate_approvals_text, generate_document_text, generate_documents_text, generate_gdpr_text,
    generate_json, generate_outcome_text, generate_stats_text, generate_status_list_text,
    generate_status_text, outcome_value,
};
