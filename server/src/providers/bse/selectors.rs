use crate::browser::Locator;

/// BSE portal selectors. The JSF portlet prefixes every id with its view namespace.
pub struct BseSelectors;

const VIEW: &str = "viewns_Z7_8A401HS0K0L5C06K03V0LHEQF2_:";
const RESULT_TABLE: &str = "formPolizas:tablaResultado:";
const PRINT_PANEL: &str = "frmPdf:tabPnlImprimirPoliza:";

/// Extra documents offered next to the certificates, cleared before each download.
const OTHER_DOC_PARTS: usize = 4;

fn result_id(suffix: &str) -> Locator {
    Locator::id(format!("{}{}{}", VIEW, RESULT_TABLE, suffix))
}

fn print_panel_id(suffix: &str) -> Locator {
    Locator::id(format!("{}{}{}", VIEW, PRINT_PANEL, suffix))
}

impl BseSelectors {
    pub const USERNAME_ID: &'static str = "userID";
    pub const PASSWORD_ID: &'static str = "password";
    pub const LOGIN_BUTTON_ID: &'static str = "login.button.login";
    pub const LOGIN_OK_CLASS: &'static str = "user-profile";
    pub const LOGIN_MESSAGE_CLASS: &'static str = "wpsFieldSuccessText";

    pub const POLICY_ROW: &'static str = "tr.ui-widget-content";
    pub const POLICY_ROW_STATUS: &'static str =
        ".//td[contains(@class, 'text-right')][.//div[contains(@class, 'filtroResponsivo')]]";

    pub const DETAILS_COLUMN: &'static str = "div.column.second-col";
    pub const DETAILS_ITEM: &'static str = "div > div";
    pub const DETAILS_LABEL: &'static str = "label";
    pub const DETAILS_VALUE: &'static str = "div.desc";

    pub const DOWNLOAD_ERROR_TAG: &'static str = "pre";

    /// SOA and Mercosur.
    pub const CERTIFICATE_COUNT: usize = 2;

    pub fn search_button() -> Locator {
        result_id("btnBuscar")
    }

    pub fn policy_number_input() -> Locator {
        result_id("filNroPoliza")
    }

    pub fn expand_details() -> Locator {
        result_id("0:j_id_6r")
    }

    pub fn download_button() -> Locator {
        print_panel_id("j_id_2v")
    }

    pub fn other_doc_checkboxes() -> Vec<Locator> {
        let mut locators: Vec<Locator> = (0..OTHER_DOC_PARTS)
            .map(|i| print_panel_id(&format!("j_id_2a:{}:chkListaPartes", i)))
            .collect();
        locators.push(print_panel_id("checkPoliza"));
        locators
    }

    /// Index 0 is the SOA certificate, 1 the Mercosur card.
    pub fn certificate_checkbox(index: usize) -> Locator {
        debug_assert!(index < Self::CERTIFICATE_COUNT);
        print_panel_id(&format!("j_id_2o:{}:chkCert", index))
    }
}
