//! Prompt construction for the valuation workflow.

use torivahti_core::ItemRecord;

/// Turns an item record into a `(system, user)` message pair for the
/// chat-completions API. Implementations must be stateless enough to share
/// across the polling and valuation loops.
pub trait PromptBuilder: Send + Sync {
    fn build_prompt(&self, item: &ItemRecord) -> (String, String);
}

/// Prompt for free-item (giveaway) listings. Asks for a short Finnish
/// assessment and requires two machine-parseable price lines so
/// [`crate::parse_prices`] can lift the numbers out of the narrative.
#[derive(Debug, Clone, Copy, Default)]
pub struct GiveawayPromptBuilder;

impl PromptBuilder for GiveawayPromptBuilder {
    fn build_prompt(&self, item: &ItemRecord) -> (String, String) {
        let system = "Olet avustaja, joka arvioi ilmaiseksi annettavia \
                      käytettyjä tavaroita. Vastaa suomeksi ja lyhyesti. \
                      Päätä vastauksesi aina kahteen riviin muodossa:\n\
                      HINTA_UUTENA: X€\n\
                      ARVO_NYT: Y€\n\
                      missä X on arvio uushinnasta ja Y arvio nykyarvosta \
                      kokonaislukuina euroissa."
            .to_owned();

        let user = format!(
            "Arvioi tämä ilmaiseksi annettava tavara:\n\n\
             Otsikko: {}\n\
             Kuvaus: {}\n\
             Sijainti: {}\n\
             Myyjä: {}\n\n\
             Kerro lyhyesti mikä tavara on, missä kunnossa se \
             todennäköisesti on ja onko se hakemisen arvoinen.",
            field(item.title.as_deref()),
            field(item.description.as_deref()),
            field(item.location.as_deref()),
            field(item.seller.as_deref()),
        );

        (system, user)
    }
}

fn field(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => "N/A",
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn prompt_includes_item_fields() {
        let mut item = ItemRecord::empty("123", Utc::now());
        item.title = Some("Sohva".to_owned());
        item.description = Some("Hyväkuntoinen kulmasohva".to_owned());
        item.location = Some("Helsinki".to_owned());

        let (system, user) = GiveawayPromptBuilder.build_prompt(&item);
        assert!(system.contains("HINTA_UUTENA"));
        assert!(system.contains("ARVO_NYT"));
        assert!(user.contains("Sohva"));
        assert!(user.contains("Hyväkuntoinen kulmasohva"));
        assert!(user.contains("Helsinki"));
    }

    #[test]
    fn missing_fields_become_placeholders() {
        let item = ItemRecord::empty("123", Utc::now());
        let (_, user) = GiveawayPromptBuilder.build_prompt(&item);
        assert!(user.contains("Otsikko: N/A"));
        assert!(user.contains("Myyjä: N/A"));
    }
}
