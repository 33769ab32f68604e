pub mod professional;
pub mod slots;

pub use professional::ProfessionalService;
pub use slots::{BaseSlotCache, SlotGenerator};
