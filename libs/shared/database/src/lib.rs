pub mod appointments;
pub mod memory;
pub mod supabase;

pub use appointments::{AppointmentStore, StoreError, SupabaseAppointmentStore};
pub use memory::InMemoryAppointmentStore;
