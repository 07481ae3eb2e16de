pub struct SancorSelectors;

impl SancorSelectors {
    // Auth0 hosted login
    pub const USERNAME: &'static str = "[name=\"username\"]";
    pub const PASSWORD: &'static str = "[name=\"password\"]";
    pub const LOGIN_BUTTON_CLASS: &'static str = "auth0-label-submit";
    pub const LOGIN_OK: &'static str = "//ul[@class='LinkBar']";
    pub const LOGIN_MESSAGE: &'static str = "span.animated.fadeInUp";

    pub const POLICY_INPUT_ID: &'static str = "ReferenceNumber";
    pub const SEARCH_BUTTON_ID: &'static str = "searchPolicy";
    pub const RESULT_ROWS_CLASS: &'static str = "xgrid_rows";
    pub const RESULT_LABEL_CLASS: &'static str = "label";
    pub const NO_RESULTS_CLASS: &'static str = "dummyRow";

    pub const HISTORY_TABLE_ID: &'static str = "historicalPolicy";
    pub const MOVEMENT_DATE_ID: &'static str = "movementDate";

    pub const SOA_ID: &'static str = "132Certificado de Cobertura SOA";
    pub const MERCOSUR_ID: &'static str = "88Mercosur";
}
