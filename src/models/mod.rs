pub mod address;
pub mod cart;
pub mod coupon;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod shipping;

pub use address::{Address, AddressDraft, AddressMode, City, ResolvedAddress};
pub use cart::{Cart, CartLine, SellerRef, ShippableItem};
pub use coupon::{BackendTotals, CouponApplication, DiscountType};
pub use order::{CreatedOrder, OrderConfirmation, OrderDraft, OrderItemDraft, PaymentRedirect};
pub use payment::{PaymentInit, PaymentMethod};
pub use pricing::{round2, PricingSnapshot, TaxBreakdown};
pub use shipping::{DeliveryMethod, DeliverySpeed, PickupCenter, QuoteKey, ShippingQuote};
