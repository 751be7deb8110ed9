use fundwatch::services::ticker_resolver::{resolve, resolve_with_strategy, strategy_order};

#[test]
fn bare_display_code_gets_suffix() {
    assert_eq!(resolve("HGLG", ""), Some("HGLG11".to_string()));
    assert_eq!(resolve("hglg", ""), Some("HGLG11".to_string()));
}

#[test]
fn known_prefixes_are_stripped_from_display_name() {
    assert_eq!(resolve("FII HGLG", ""), Some("HGLG11".to_string()));
    assert_eq!(resolve("FIAGRO RZAG", ""), Some("RZAG11".to_string()));
}

#[test]
fn five_letter_display_code_is_kept_whole() {
    assert_eq!(resolve("BRCRI", ""), Some("BRCRI11".to_string()));
}

#[test]
fn display_already_holding_a_ticker_is_used_as_is() {
    let r = resolve_with_strategy("KNRI11", "KINEA RENDA IMOBILIARIA FUNDO").unwrap();
    assert_eq!(r.ticker, "KNRI11");
    assert_eq!(r.strategy, "display_full_ticker");
}

#[test]
fn multi_token_display_builds_code_from_first_two_tokens() {
    assert_eq!(resolve("HGI CRI", ""), Some("HGIC11".to_string()));

    let r = resolve_with_strategy("FII HGI CRI", "").unwrap();
    assert_eq!(r.ticker, "HGIC11");
    assert_eq!(r.strategy, "display_tokens");
}

#[test]
fn four_letter_first_token_is_not_extended() {
    assert_eq!(resolve("XPML SHOPPING", ""), Some("XPML11".to_string()));
}

#[test]
fn long_name_code_before_fundo() {
    let r = resolve_with_strategy("", "FII XPLG FUNDO DE INVESTIMENTO IMOBILIARIO").unwrap();
    assert_eq!(r.ticker, "XPLG11");
    assert_eq!(r.strategy, "long_code_before_fundo");
}

#[test]
fn long_name_fii_prefix() {
    let r = resolve_with_strategy("", "Fundo de Investimento FII VISC Shoppings").unwrap();
    assert_eq!(r.ticker, "VISC11");
    assert_eq!(r.strategy, "long_fii_prefix");
}

#[test]
fn long_name_fii_prefix_truncates_to_four_letters() {
    assert_eq!(resolve("", "Cotas do FII BTLOGX Logistica"), Some("BTLO11".to_string()));
}

#[test]
fn long_name_leading_letters() {
    let r = resolve_with_strategy("", "MXRF Fundo de Investimento").unwrap();
    // "MXRF Fundo" also matches the code-before-fundo pattern, which runs first
    assert_eq!(r.ticker, "MXRF11");
    assert_eq!(r.strategy, "long_code_before_fundo");

    let r = resolve_with_strategy("", "RBRR Recebiveis").unwrap();
    assert_eq!(r.ticker, "RBRR11");
    assert_eq!(r.strategy, "long_leading_letters");
}

#[test]
fn unstructured_long_name_falls_back_to_acronym() {
    let r = resolve_with_strategy("", "Totally Unstructured Name").unwrap();
    assert_eq!(r.strategy, "long_acronym");
    assert_eq!(r.ticker, "TUNX11");
}

#[test]
fn acronym_uses_at_most_four_words() {
    assert_eq!(
        resolve("", "Patrimonio Maior Imoveis Comerciais Renda Plus"),
        Some("PMIC11".to_string())
    );
}

#[test]
fn short_long_name_is_taken_as_leading_letters() {
    assert_eq!(resolve("", "Xpto"), Some("XPTO11".to_string()));
}

#[test]
fn nothing_usable_is_unresolved_not_a_panic() {
    assert_eq!(resolve("", ""), None);
    assert_eq!(resolve("  ", "   "), None);
    assert_eq!(resolve("", "Xp"), None);
    assert_eq!(resolve("X", "123 456"), None);
}

#[test]
fn display_name_takes_precedence_over_long_name() {
    assert_eq!(
        resolve("HGLG", "FII XPLG FUNDO DE INVESTIMENTO"),
        Some("HGLG11".to_string())
    );
}

#[test]
fn single_short_display_token_falls_through_to_long_name() {
    assert_eq!(resolve("XP", "FII XPLG FUNDO"), Some("XPLG11".to_string()));
}

#[test]
fn strategy_order_is_stable() {
    assert_eq!(
        strategy_order(),
        vec![
            "display_full_ticker",
            "display_bare_code",
            "display_tokens",
            "long_code_before_fundo",
            "long_fii_prefix",
            "long_leading_letters",
            "long_acronym",
        ]
    );
}
