//! Ticket record shape and the pure mapping rules shared by every storage
//! backend: row decode, field-map encode, id allocation, derived fields and
//! aggregate statistics. Nothing in this crate performs I/O.

pub mod days_open;
pub mod decode;
pub mod encode;
pub mod filter;
pub mod record;
pub mod stats;
pub mod ticket_id;

pub use days_open::DaysOpen;
pub use decode::{decode_row, CellValue, RawRow, RowDecode, RowIdentity};
pub use encode::{
    encode_create, encode_update, EncodedCreate, EncodedPatch, FieldMap, NewTicket,
    ReadOnlyField, TicketField, TicketPatch,
};
pub use filter::{dropdown_options, sort_newest_first, DropdownOptions, TicketFilter};
pub use record::{is_closed_status, LabelRef, Ticket};
pub use stats::{calculate_stats, StaffLoad, TicketStats};
pub use ticket_id::{next_ticket_id, TicketId};
