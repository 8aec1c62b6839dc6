pub mod association;

pub use association::{reference_text_ids, report, AssociationLinker, LinkStats};
