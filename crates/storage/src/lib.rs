pub mod conformance;
mod error;
mod memory;
mod record;
mod status;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStorage;
pub use record::{Account, ElevationRequest, Order, OrderFilter, ProfileUpdate};
pub use status::{
    AccountStatus, OrderStatus, ParseStatusError, PaymentStatus, RequestStatus, RequestType, Role,
};
pub use traits::{AccountStore, ElevationRequestStore, OrderStore, Storage, TransitionOutcome};
