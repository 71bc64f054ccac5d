//! Storefront entities

pub mod cart;
pub mod cart_item;
pub mod category;
pub mod comparison_item;
pub mod comparison_list;
pub mod coupon;
pub mod coupon_use;
pub mod order;
pub mod order_item;
pub mod product;
pub mod recently_viewed;
pub mod review;
pub mod wishlist;
pub mod wishlist_item;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use comparison_item::{Entity as ComparisonItem, Model as ComparisonItemModel};
pub use comparison_list::{Entity as ComparisonList, Model as ComparisonListModel};
pub use coupon::{DiscountType, Entity as Coupon, Model as CouponModel};
pub use coupon_use::{Entity as CouponUse, Model as CouponUseModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use recently_viewed::{Entity as RecentlyViewed, Model as RecentlyViewedModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use wishlist::{Entity as Wishlist, Model as WishlistModel};
pub use wishlist_item::{Entity as WishlistItem, Model as WishlistItemModel};
