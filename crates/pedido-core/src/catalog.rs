//! Order-status catalog and customer-facing message texts

/// Closed set of status codes accepted from the order system.
///
/// Unknown codes are rejected at the dispatch boundary, not mapped to a
/// fallback text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    EmPreparo,
    Pronto,
    SaiuParaEntrega,
    Finalizado,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [
        OrderStatus::EmPreparo,
        OrderStatus::Pronto,
        OrderStatus::SaiuParaEntrega,
        OrderStatus::Finalizado,
    ];

    /// Parse a status code as sent by the order system.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "EM_PREPARO" => Some(Self::EmPreparo),
            "PRONTO" => Some(Self::Pronto),
            "SAIU_PARA_ENTREGA" => Some(Self::SaiuParaEntrega),
            "FINALIZADO" => Some(Self::Finalizado),
            _ => None,
        }
    }

    /// Wire code for this status.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmPreparo => "EM_PREPARO",
            Self::Pronto => "PRONTO",
            Self::SaiuParaEntrega => "SAIU_PARA_ENTREGA",
            Self::Finalizado => "FINALIZADO",
        }
    }

    /// Notification text shown to the customer.
    pub fn notification_text(&self) -> &'static str {
        match self {
            Self::EmPreparo => "🕑 Seu pedido está em preparo.",
            Self::Pronto => "✅ Seu pedido está pronto!",
            Self::SaiuParaEntrega => "🚚 Seu pedido saiu para entrega.",
            Self::Finalizado => "🙏 Pedido finalizado. Obrigado pela preferência!",
        }
    }
}

/// Compose the notification body for a status update.
///
/// The greeting line and the order-number line are optional; the status
/// text always comes last, in this fixed order.
pub fn compose_status_message(
    status: OrderStatus,
    customer_name: Option<&str>,
    order_number: Option<&str>,
) -> String {
    let mut body = String::new();
    if let Some(name) = customer_name {
        body.push_str(&format!("Olá {} 👋\n", name));
    }
    if let Some(number) = order_number {
        body.push_str(&format!("Pedido {}\n\n", number));
    }
    body.push_str(status.notification_text());
    body
}

/// The two-part greeting sent to first-time contacts.
#[derive(Debug, Clone)]
pub struct GreetingTexts {
    /// First message: the welcome text
    pub welcome: String,
    /// Second message: the digital menu link
    pub menu: String,
}

impl GreetingTexts {
    /// Build the greeting pair with the configured menu link.
    pub fn new(menu_link: &str) -> Self {
        Self {
            welcome: "👋 Olá! Seja bem-vindo(a) 😄\n\
                      Sou o atendimento automático da *Dominus Food*."
                .to_string(),
            menu: format!(
                "📖 *Nosso Cardápio Digital*\n👉 {}\n\n\
                 Fique à vontade para escolher e me dizer o que deseja pedir 😋",
                menu_link
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(OrderStatus::from_code("PRONTO"), Some(OrderStatus::Pronto));
        assert_eq!(
            OrderStatus::from_code("SAIU_PARA_ENTREGA"),
            Some(OrderStatus::SaiuParaEntrega)
        );
        assert_eq!(OrderStatus::from_code("ENTREGUE"), None);
        assert_eq!(OrderStatus::from_code(""), None);
        // codes are case sensitive
        assert_eq!(OrderStatus::from_code("pronto"), None);
    }

    #[test]
    fn test_code_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_compose_full_message() {
        let body = compose_status_message(OrderStatus::Pronto, Some("Ana"), Some("42"));
        assert_eq!(body, "Olá Ana 👋\nPedido 42\n\n✅ Seu pedido está pronto!");
    }

    #[test]
    fn test_compose_without_name() {
        let body = compose_status_message(OrderStatus::EmPreparo, None, Some("7"));
        assert_eq!(body, "Pedido 7\n\n🕑 Seu pedido está em preparo.");
    }

    #[test]
    fn test_compose_bare_status() {
        let body = compose_status_message(OrderStatus::Finalizado, None, None);
        assert_eq!(body, "🙏 Pedido finalizado. Obrigado pela preferência!");
    }

    #[test]
    fn test_greeting_texts() {
        let texts = GreetingTexts::new("https://cardapio.example.com");
        assert!(texts.welcome.contains("Seja bem-vindo"));
        assert!(texts.menu.contains("https://cardapio.example.com"));
    }
}
