pub mod booking;
pub mod decorator;
pub mod payment;
pub mod user;

pub use booking::{
    AssignDecorator, Booking, BookingStatus, DecoratorRef, NewBooking, PaymentStatus,
};
pub use decorator::{Decorator, DecoratorStatus, NewDecorator, WorkStatus};
pub use payment::Payment;
pub use user::{User, UserRole};
