//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories. They are
//! responsible for:
//! - Implementing business rules (visibility, authorship, unique slugs)
//! - Coordinating several repositories for one operation
//! - Turning storage failures into typed errors

pub mod comment;
pub mod email;
pub mod password;
pub mod post;
pub mod subscriber;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use email::{build_mailer, share_mail, MailError, Mailer, OutgoingMail};
pub use password::{hash_password, verify_password};
pub use post::{generate_slug, PostListing, PostService, PostServiceError, POSTS_PER_PAGE};
pub use subscriber::{SubscribeOutcome, SubscriberService, SubscriberServiceError};
pub use user::{SignupInput, UserService, UserServiceError};
