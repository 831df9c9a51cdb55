pub mod storage;
pub use storage::MediaStorage;

pub mod tokens;
pub use tokens::{TokenIssuer, TokenPair, TokenType};

pub mod validation;
pub use validation::{FieldErrors, Registration};

pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, AuthUser, UserProfile};
pub use auth_service_impl::SeaOrmAuthService;

pub mod analysis_service;
pub mod analysis_service_impl;
pub use analysis_service::{AnalysisError, AnalysisService, AnalysisSummary, UploadedImage};
pub use analysis_service_impl::SeaOrmAnalysisService;
