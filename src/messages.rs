//! Message catalog mapping `(key, param)` pairs to user-facing text.
//!
//! This stands in for the host platform's string bundles: every error code and
//! system chat notification is rendered through [`localize`]. Unknown keys fall
//! back to the key itself so a missing translation never breaks the protocol.

/// English catalog entries. `{$a}` marks the substitution slot.
const STRINGS: &[(&str, &str)] = &[
    ("invalidjson", "Invalid JSON string"),
    ("actionrequired", "An action is required"),
    ("skeyrequired", "A session key is required"),
    ("invalidaction", "Invalid action: {$a}"),
    ("invalidkey", "Invalid key"),
    ("generalexception", "Exception: {$a}"),
    ("settingsnotfound", "Settings not found"),
    ("chatnotavailable", "Chat not available"),
    ("notgroupnotteam", "Not exists a related group"),
    ("notmembersingroup", "The group {$a} has no members"),
    ("usernotintogroup", "The user does not belong to the group"),
    ("fieldrequired", "The field {$a} is required"),
    ("invalidcardcode", "Invalid card code"),
    ("invalidcardtype", "Invalid card type"),
    ("typenotallowed", "Current user can't play this card type"),
    ("carddontplayed", "Card don't played"),
    ("errorgamestart", "A game is already started"),
    ("invalidgameitem", "Unknown action or technology"),
    ("notassigneditem", "The item is not assigned to the user"),
    ("alreadyrunning", "The item is already running"),
    ("notrequiredfiles", "It does not have the required files"),
    ("notrequiredtechnologies", "It does not have the required technologies"),
    ("notresources", "It does not have the required resources"),
    ("notrunningaction", "The action is not running"),
    ("notrunningtech", "The technology is not running"),
    ("techrunningrequired", "The technology is required by a running action"),
    // System chat notifications, keyed by "message" + the triggering action.
    ("messageactionplaycard", "{$a} has played a card"),
    ("messageactionunplaycard", "{$a} has removed a card"),
    ("messageactionendcase", "{$a} has closed the current case"),
    ("messageactioncasepassed", "The team passed the case"),
    ("messageactioncasefailed", "The team failed the case"),
    ("messageactionattemptfailed", "First attempt failed, one retry left"),
    ("messageactionplayerconnected", "{$a} is connected"),
    ("messageactionplayerdisconnected", "{$a} has disconnected"),
    ("messageactiongamestart", "{$a} started a new game"),
    ("messageactiongameover", "{$a} ended the game"),
    ("messageactionplayaction", "{$a} has started an action"),
    ("messageactionstopaction", "{$a} has stopped an action"),
    ("messageactionplaytechnology", "{$a} has started a technology"),
    ("messageactionstoptechnology", "{$a} has stopped a technology"),
    ("messageactionchangetimeframe", "{$a} changed the game speed"),
    ("messageactiongethealth", "{$a} requested a health report"),
    ("messageactiongamestate", "{$a} requested the game state"),
    ("messagesc_actioncompleted", "The action {$a} has finished"),
    ("messagesc_technologycompleted", "The technology {$a} has finished"),
    ("messagesc_healthupdate", "A new health measurement is available"),
    ("messagesc_lapsechanged", "Time has moved forward"),
    ("messagesc_autogameover", "The game has ended: {$a}"),
];

/// Resolve a catalog key into display text, substituting `param` into `{$a}`.
///
/// Falls back to the key itself when no entry exists.
pub fn localize(key: &str, param: Option<&str>) -> String {
    match STRINGS.iter().find(|(k, _)| *k == key) {
        Some((_, template)) => match param {
            Some(value) => template.replace("{$a}", value),
            None => template.replace("{$a}", ""),
        },
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_parameter() {
        assert_eq!(
            localize("invalidaction", Some("fly")),
            "Invalid action: fly"
        );
    }

    #[test]
    fn unknown_key_falls_back_to_key() {
        assert_eq!(localize("nosuchkey", None), "nosuchkey");
    }

    #[test]
    fn missing_parameter_leaves_no_placeholder() {
        assert_eq!(localize("generalexception", None), "Exception: ");
    }
}
