//! Domain services taking part in order fulfillment.
//!
//! Each service owns one slice of business data behind an async trait, with
//! an in-memory implementation. Services are reached only through addresses
//! published in the registry and dialed over the [`LocalNetwork`]; they never
//! call each other.

pub mod customer;
pub mod error;
pub mod host;
pub mod inventory;
pub mod network;
pub mod payment;
pub mod shipping;

pub use customer::{Customer, CustomerService, InMemoryCustomerService};
pub use error::{Result, ServiceError};
pub use host::ServiceHost;
pub use inventory::{
    InMemoryInventoryService, InventoryService, ReservationResult, SupplierDelivery,
};
pub use network::{LocalNetwork, ServiceHandle, ServiceKind};
pub use payment::{InMemoryPaymentService, Payment, PaymentService, PaymentState};
pub use shipping::{
    InMemoryShippingService, Shipment, ShipmentResult, ShipmentStatus, ShippingService,
};
