//! Orchestration of NFC key operations: configuration load, action dispatch,
//! composite execution and error reporting.

pub mod action;
pub mod cancel;
pub mod composite;
pub mod config_loader;
pub mod error;
pub mod interactor;
pub mod payload;
pub mod presenter;
pub mod session;
pub mod settings;
pub mod user_input;
pub mod view;

pub use action::KeyAction;
pub use cancel::CancelScope;
pub use composite::CompositeOperation;
pub use config_loader::{ConfigurationLoader, DefaultConfigurationLoader, TagConfigRequest};
pub use error::{reason_for, OperationError};
pub use interactor::{Interactors, NfcInteractor};
pub use payload::{PayloadFactory, PictureSource};
pub use presenter::KeysPresenter;
pub use session::{Session, TagConfiguration};
pub use settings::{load_settings, load_settings_from, KeysSettings};
pub use view::KeysView;
