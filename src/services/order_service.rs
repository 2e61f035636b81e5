use chrono::Utc;
use serde_json::{Value, json};

use crate::{
    dto::orders::{CreateOrderRequest, UpdateOrderStatusRequest, UpdatePaymentStatusRequest},
    error::{AppError, AppResult},
    lifecycle::{OrderStatus, PaymentStatus},
    middleware::auth::{AuthUser, ensure_admin, ensure_owner_or_admin},
    models::{Order, OrderItem, collections::ORDERS},
    notify::{EmailDraft, Template, notify_owner},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{audit, load},
    state::AppState,
    stock::{StockReconciler, aggregate, demand_of},
    store::{Conditional, Direction, Filter, Query, encode, fields, new_id},
};

fn reconciler(state: &AppState) -> StockReconciler<'_> {
    StockReconciler::new(state.store.as_ref(), state.settings.consistency)
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn confirmation(order: &Order) -> EmailDraft {
    EmailDraft {
        subject: "Order Confirmation".into(),
        template: Template::OrderConfirmation,
        data: json!({
            "orderId": order.id,
            "totalAmount": order.total_amount,
            "paymentStatus": order.payment_status,
            "items": order.items,
            "shippingAddress": order.shipping_address.one_line(),
        }),
    }
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }
    if payload
        .items
        .iter()
        .any(|line| line.product_id.trim().is_empty() || line.quantity <= 0)
    {
        return Err(AppError::BadRequest(
            "Each item needs a productId and a positive quantity".into(),
        ));
    }
    let shipping_address = payload
        .shipping_address
        .ok_or_else(|| AppError::BadRequest("Shipping address is required".into()))?;
    if payload.payment_method.trim().is_empty() {
        return Err(AppError::BadRequest("Payment method is required".into()));
    }

    let demand = aggregate(
        payload
            .items
            .iter()
            .map(|line| (line.product_id.clone(), line.quantity)),
    )?;
    let stock = reconciler(state);
    let products = stock.check(&demand).await?;

    let mut items = Vec::with_capacity(payload.items.len());
    for line in &payload.items {
        let product = products
            .iter()
            .find(|p| p.id == line.product_id)
            .ok_or_else(|| AppError::not_found(format!("Product {}", line.product_id)))?;
        items.push(OrderItem {
            product_id: product.id.clone(),
            quantity: line.quantity,
            price: product.price,
            name: product.name.clone(),
        });
    }
    let total_amount = round_cents(items.iter().map(|i| i.price * i.quantity as f64).sum());

    let now = Utc::now();
    let order = Order {
        id: new_id(),
        user_id: user.uid.clone(),
        items,
        shipping_address,
        total_amount,
        payment_method: payload.payment_method.trim().to_string(),
        payment_status: PaymentStatus::Pending,
        order_status: OrderStatus::Pending,
        payment_id: None,
        payment_details: None,
        tracking_number: None,
        cancelled_at: None,
        created_at: now,
        updated_at: now,
    };

    if state.strict() {
        stock.reserve(&demand).await?;
        if let Err(err) = state.store.set(ORDERS, &order.id, encode(&order)?).await {
            if let Err(restore) = stock.release(&demand).await {
                tracing::error!(error = %restore, order_id = %order.id, "failed to restore stock after aborted order");
            }
            return Err(err.into());
        }
    } else {
        state.store.set(ORDERS, &order.id, encode(&order)?).await?;
        stock.reserve(&demand).await?;
    }

    tracing::info!(order_id = %order.id, total = order.total_amount, lines = order.items.len(), "order placed");

    let text = format!(
        "Your order #{} has been placed successfully! Total: ₹{}. We'll send you updates as your order is processed.",
        order.id, order.total_amount
    );
    notify_owner(
        state.store.as_ref(),
        &state.notifier,
        &user.uid,
        Some(confirmation(&order)),
        Some(text),
    )
    .await;

    audit(
        state,
        user,
        "orders.create",
        &order.id,
        json!({ "totalAmount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created successfully",
        order,
        None,
    ))
}

fn list_query(query: &OrderListQuery) -> AppResult<Query> {
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<OrderStatus>()?),
        None => None,
    };
    let payment = match query.payment_status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(raw.parse::<PaymentStatus>()?),
        None => None,
    };
    Ok(Query::collection(ORDERS)
        .filter_opt(status.map(|s| Filter::eq("orderStatus", s.as_str())))
        .filter_opt(payment.map(|p| Filter::eq("paymentStatus", p.as_str())))
        .order_by("createdAt", Direction::Desc))
}

async fn run_list(
    state: &AppState,
    store_query: Query,
    query: &OrderListQuery,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let orders = state
        .store
        .query(&store_query)
        .await?
        .iter()
        .map(|doc| doc.decode::<Order>())
        .collect::<Result<Vec<_>, _>>()?;
    let (items, meta) = query.pagination().apply(orders);
    Ok(ApiResponse::success("Ok", items, Some(meta)))
}

pub async fn my_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<Vec<Order>>> {
    let store_query = list_query(&query)?.filter(Filter::eq("userId", user.uid.as_str()));
    run_list(state, store_query, &query).await
}

pub async fn all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<Vec<Order>>> {
    ensure_admin(user)?;
    let store_query = list_query(&query)?;
    run_list(state, store_query, &query).await
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<Order>> {
    let order: Order = load(state, ORDERS, id, "Order").await?;
    ensure_owner_or_admin(user, &order.user_id)?;
    Ok(ApiResponse::success("Ok", order, None))
}

/// Cancel and put the items back on the shelf. Refused once shipped, and a
/// second cancel is refused too, so stock is restored at most once.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<Order>> {
    let order: Order = load(state, ORDERS, id, "Order").await?;
    ensure_owner_or_admin(user, &order.user_id)?;
    order.order_status.ensure_cancellable()?;

    let now = Utc::now();
    let patch = fields(json!({
        "orderStatus": OrderStatus::Cancelled,
        "cancelledAt": now,
        "updatedAt": now,
    }));
    let demand = demand_of(&order.items)?;
    let stock = reconciler(state);

    let updated = if state.strict() {
        let allowed: Vec<Value> = OrderStatus::CANCELLABLE
            .iter()
            .map(|s| Value::from(s.as_str()))
            .collect();
        match state
            .store
            .update_if(ORDERS, id, "orderStatus", &allowed, patch)
            .await?
        {
            Conditional::Applied(doc) => {
                stock.release(&demand).await?;
                doc.decode::<Order>()?
            }
            Conditional::Refused(doc) => {
                let current = doc.decode::<Order>()?;
                current.order_status.ensure_cancellable()?;
                return Err(AppError::Conflict("Order changed concurrently".into()));
            }
            Conditional::Missing => return Err(AppError::not_found("Order")),
        }
    } else {
        stock.release(&demand).await?;
        state.store.update(ORDERS, id, patch).await?.decode::<Order>()?
    };

    tracing::info!(order_id = %id, "order cancelled, stock restored");
    audit(
        state,
        user,
        "orders.cancel",
        id,
        json!({ "from": order.order_status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order cancelled successfully",
        updated,
        None,
    ))
}

/// Admin status change. Moving into `cancelled` returns stock, moving out of
/// it takes stock again; any other transition only rewrites the field.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let next = payload.order_status.trim().parse::<OrderStatus>()?;
    let order: Order = load(state, ORDERS, id, "Order").await?;
    let previous = order.order_status;

    let now = Utc::now();
    let mut patch = fields(json!({ "orderStatus": next, "updatedAt": now }));
    let tracking = payload
        .tracking_number
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(tracking) = tracking {
        patch.insert("trackingNumber".into(), Value::String(tracking.to_string()));
    }

    let demand = demand_of(&order.items)?;
    let stock = reconciler(state);
    let releasing = previous.reserves_stock() && !next.reserves_stock();
    let reserving = !previous.reserves_stock() && next.reserves_stock();

    if releasing {
        patch.insert("cancelledAt".into(), json!(now));
    }
    if reserving {
        if !state.strict() {
            stock.check(&demand).await?;
        }
        stock.reserve(&demand).await?;
    }

    let written = if state.strict() {
        let allowed = [Value::from(previous.as_str())];
        match state
            .store
            .update_if(ORDERS, id, "orderStatus", &allowed, patch)
            .await
        {
            Ok(Conditional::Applied(doc)) => Ok(doc),
            Ok(Conditional::Refused(_)) => {
                Err(AppError::Conflict("Order changed concurrently".into()))
            }
            Ok(Conditional::Missing) => Err(AppError::not_found("Order")),
            Err(err) => Err(err.into()),
        }
    } else {
        state.store.update(ORDERS, id, patch).await.map_err(AppError::from)
    };

    let doc = match written {
        Ok(doc) => doc,
        Err(err) => {
            if reserving {
                if let Err(restore) = stock.release(&demand).await {
                    tracing::error!(error = %restore, order_id = %id, "failed to undo stock reservation");
                }
            }
            return Err(err);
        }
    };
    if releasing {
        stock.release(&demand).await?;
    }
    let updated = doc.decode::<Order>()?;

    tracing::info!(order_id = %id, from = %previous, to = %next, "order status updated");

    let mut text = format!("Your order #{id} status: {next}");
    if let Some(tracking) = tracking {
        text.push_str(&format!(". Tracking: {tracking}"));
    }
    notify_owner(
        state.store.as_ref(),
        &state.notifier,
        &updated.user_id,
        None,
        Some(text),
    )
    .await;

    audit(
        state,
        user,
        "orders.status",
        id,
        json!({ "from": previous, "to": next }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order status updated successfully",
        updated,
        None,
    ))
}

pub async fn update_payment_status(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdatePaymentStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let order: Order = load(state, ORDERS, id, "Order").await?;
    ensure_owner_or_admin(user, &order.user_id)?;
    let status = payload.payment_status.trim().parse::<PaymentStatus>()?;

    let mut patch = fields(json!({ "paymentStatus": status, "updatedAt": Utc::now() }));
    if let Some(payment_id) = payload.payment_id.filter(|p| !p.trim().is_empty()) {
        patch.insert("paymentId".into(), Value::String(payment_id));
    }
    if let Some(details) = payload.payment_details {
        patch.insert("paymentDetails".into(), details);
    }
    let updated = state.store.update(ORDERS, id, patch).await?.decode::<Order>()?;

    audit(
        state,
        user,
        "orders.payment_status",
        id,
        json!({ "from": order.payment_status, "to": status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Payment status updated successfully",
        updated,
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_round_to_cents() {
        assert_eq!(round_cents(0.1 + 0.2), 0.3);
        assert_eq!(round_cents(3.0 * 33.333), 100.0);
    }
}
