use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{auth as auth_dto, orders as order_dto, payment as payment_dto, products, schedule},
    lifecycle::{OrderStatus, PaymentStatus, ScheduleStatus},
    models::{
        Appointment, Booking, Category, Order, OrderItem, Pet, Product, Profile, Review, Role,
        ShippingAddress, User,
    },
    payment::GatewayOrder,
    response::{ApiResponse, Meta},
    routes::{
        appointments, auth, bookings, health, orders, params, payment, products as product_routes,
    },
    slots::SlotAvailability,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::verify_otp,
        auth::get_profile,
        auth::update_profile,
        auth::add_pet,
        auth::logout,
        appointments::available_slots,
        appointments::create_appointment,
        appointments::my_appointments,
        appointments::all_appointments,
        appointments::get_appointment,
        appointments::cancel_appointment,
        appointments::update_appointment_status,
        bookings::booking_slots,
        bookings::create_booking,
        bookings::my_bookings,
        bookings::all_bookings,
        bookings::get_booking,
        bookings::cancel_booking,
        bookings::update_booking_status,
        orders::create_order,
        orders::my_orders,
        orders::all_orders,
        orders::get_order,
        orders::cancel_order,
        orders::update_order_status,
        orders::update_payment_status,
        payment::create_payment_order,
        payment::verify_payment,
        payment::create_service_payment,
        payment::verify_service_payment,
        payment::payment_details,
        payment::refund,
        product_routes::list_products,
        product_routes::list_categories,
        product_routes::get_product,
        product_routes::create_product,
        product_routes::update_product,
        product_routes::delete_product,
        product_routes::add_review
    ),
    components(
        schemas(
            User,
            Role,
            Profile,
            Pet,
            Appointment,
            Booking,
            Order,
            OrderItem,
            ShippingAddress,
            Product,
            Review,
            Category,
            ScheduleStatus,
            OrderStatus,
            PaymentStatus,
            SlotAvailability,
            GatewayOrder,
            health::HealthData,
            auth_dto::VerifyOtpRequest,
            auth_dto::SessionResponse,
            auth_dto::UpdateProfileRequest,
            auth_dto::AddPetRequest,
            schedule::CreateScheduleRequest,
            schedule::UpdateScheduleStatusRequest,
            order_dto::OrderLineRequest,
            order_dto::CreateOrderRequest,
            order_dto::UpdateOrderStatusRequest,
            order_dto::UpdatePaymentStatusRequest,
            payment_dto::CreatePaymentOrderRequest,
            payment_dto::PaymentOrderResponse,
            payment_dto::VerifyPaymentRequest,
            payment_dto::VerifyServicePaymentRequest,
            payment_dto::ServicePaymentRequest,
            payment_dto::ServicePaymentResponse,
            payment_dto::PaymentVerification,
            payment_dto::RefundRequest,
            products::CreateProductRequest,
            products::UpdateProductRequest,
            products::ReviewRequest,
            products::ProductList,
            params::Pagination,
            Meta,
            ApiResponse<Product>,
            ApiResponse<products::ProductList>,
            ApiResponse<Order>,
            ApiResponse<Appointment>,
            ApiResponse<Booking>,
            ApiResponse<SlotAvailability>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Phone identity and profile endpoints"),
        (name = "Appointments", description = "Clinic appointment endpoints"),
        (name = "Bookings", description = "Grooming, training and daycare booking endpoints"),
        (name = "Orders", description = "Shop order endpoints"),
        (name = "Payment", description = "Payment gateway endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_models_and_paths_are_published() {
        let doc = ApiDoc::openapi();
        let schemas = doc
            .components
            .as_ref()
            .map(|c| c.schemas.clone())
            .unwrap_or_default();
        for name in ["Appointment", "Booking", "Order", "Product", "ShippingAddress", "Pet"] {
            assert!(schemas.contains_key(name), "missing schema {name}");
        }
        assert!(doc.paths.paths.contains_key("/api/orders"));
        assert!(doc.paths.paths.contains_key("/api/payment/verify"));

        let json = serde_json::to_value(&doc).unwrap();
        assert!(json["components"]["securitySchemes"]["bearer_auth"].is_object());
    }
}
