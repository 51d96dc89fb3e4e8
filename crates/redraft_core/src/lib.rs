pub mod domain;
pub mod ports;

pub use domain::{
    ClientProfile, ClientProfilePatch, ClientRef, NewClientProfile, RedraftRequest, TechnicalTier,
    TECHNICAL_KNOWLEDGE_RANGE,
};
pub use ports::{ClientStore, PortError, PortResult, RedraftService, RedraftStream};
