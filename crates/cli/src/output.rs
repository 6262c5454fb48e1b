//! Terminal rendering for shopper commands.
//!
//! Formatting is kept separate from printing so it can be tested.

use std::fmt::Write as _;

use boutique_client::{LoginOutcome, SessionMode, UserProfile};
use boutique_core::{LineItem, Order};

/// Write a block of text to stdout.
#[allow(clippy::print_stdout)]
pub fn print(text: &str) {
    println!("{}", text.trim_end());
}

/// Cart lines with a subtotal, or a note that the cart is empty.
pub fn cart(items: &[LineItem], mode: SessionMode) -> String {
    let owner = match mode {
        SessionMode::Anonymous => "Guest cart",
        SessionMode::Authenticating => "Cart (signing in)",
        SessionMode::Authenticated => "Account cart",
    };

    if items.is_empty() {
        return format!("{owner} is empty\n");
    }

    let mut out = format!("{owner}:\n");
    for item in items {
        let _ = writeln!(out, "{}", line(item));
    }
    match Order::total_of(items) {
        Ok(subtotal) => {
            let _ = writeln!(out, "Subtotal: {subtotal}");
        }
        Err(err) => {
            let _ = writeln!(out, "Subtotal unavailable: {err}");
        }
    }
    out
}

fn line(item: &LineItem) -> String {
    format!(
        "  {:>3} x {} [{}] @ {} = {}",
        item.quantity,
        item.name,
        item.product_id,
        item.price,
        item.line_total()
            .map_or_else(|| "overflow".to_string(), |total| total.to_string())
    )
}

/// One order with its lines.
pub fn order(order: &Order) -> String {
    let mut out = format!(
        "Order {} placed {}\n",
        order.id,
        order.date.format("%Y-%m-%d %H:%M UTC")
    );
    for item in &order.items {
        let _ = writeln!(out, "{}", line(item));
    }
    let _ = writeln!(out, "Total: {}", order.total);
    out
}

/// Order history, newest first as the server returns it.
pub fn orders(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "No orders yet\n".to_string();
    }
    orders.iter().map(order).collect::<Vec<_>>().join("\n")
}

pub fn profile(user: &UserProfile) -> String {
    format!(
        "{} {} <{}>\n  role: {}\n  sign-in: {}\n",
        user.first_name, user.last_name, user.email, user.role, user.auth_provider
    )
}

/// What a sign-in did to the cart.
pub fn login(outcome: &LoginOutcome) -> String {
    match outcome {
        LoginOutcome::Synced { merged_lines: 0, .. } => "Signed in\n".to_string(),
        LoginOutcome::Synced { merged_lines, .. } => {
            format!("Signed in, {merged_lines} guest line(s) merged into your cart\n")
        }
        LoginOutcome::Degraded(warning) => format!(
            "Signed in, but the account cart could not be reached ({}).\n\
             {} line(s) are kept locally; run `boutique cart sync` to retry.\n",
            warning.message, warning.unsynced_lines
        ),
        LoginOutcome::AlreadyInFlight => "A sign-in is already in progress\n".to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use boutique_client::SyncWarning;
    use boutique_core::Price;
    use uuid::Uuid;

    fn mug(quantity: u32) -> LineItem {
        LineItem::new("mug-01", "Ceramic Mug", Price::parse("12.50").unwrap(), quantity, None).unwrap()
    }

    #[test]
    fn test_empty_cart() {
        assert_eq!(cart(&[], SessionMode::Anonymous), "Guest cart is empty\n");
    }

    #[test]
    fn test_cart_lines_and_subtotal() {
        let text = cart(&[mug(2)], SessionMode::Authenticated);
        assert!(text.starts_with("Account cart:\n"));
        assert!(text.contains("2 x Ceramic Mug [mug-01] @ 12.50 = 25.00"));
        assert!(text.ends_with("Subtotal: 25.00\n"));
    }

    #[test]
    fn test_largest_line_still_renders_a_total() {
        let line = LineItem::new("safe-01", "Safe", Price::MAX, u32::MAX, None).unwrap();
        let text = cart(&[line], SessionMode::Anonymous);
        assert!(text.contains("= 42949672949957050327.05"));
        assert!(text.ends_with("Subtotal: 42949672949957050327.05\n"));
    }

    #[test]
    fn test_login_outcomes() {
        let synced = LoginOutcome::Synced {
            correlation_id: Uuid::new_v4(),
            merged_lines: 3,
        };
        assert!(login(&synced).contains("3 guest line(s) merged"));

        let degraded = LoginOutcome::Degraded(SyncWarning {
            correlation_id: Uuid::new_v4(),
            unsynced_lines: 2,
            message: "request timed out".to_string(),
        });
        let text = login(&degraded);
        assert!(text.contains("request timed out"));
        assert!(text.contains("2 line(s) are kept locally"));
    }

    #[test]
    fn test_no_orders() {
        assert_eq!(orders(&[]), "No orders yet\n");
    }
}
