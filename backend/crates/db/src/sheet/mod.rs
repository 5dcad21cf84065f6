//! Workbook-backed ticket storage: one worksheet, one ticket per row, the
//! ticket id derived from the row position.

pub mod layout;
pub mod xlsx_repository;

pub use layout::IdSource;
pub use xlsx_repository::XlsxTicketRepository;
