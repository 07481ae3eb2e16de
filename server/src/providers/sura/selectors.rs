use crate::browser::Locator;

pub struct SuraSelectors;

impl SuraSelectors {
    pub const USERNAME_ID: &'static str = "Login1_UserName";
    pub const PASSWORD_ID: &'static str = "Login1_Password";
    pub const LOGIN_BUTTON_ID: &'static str = "Login1_LoginButton";
    pub const LOGIN_OK: &'static str = "p#nombreUsuario.datosUsuario";

    pub const OVERLAY: &'static str = "div.blockUI.blockOverlay";
    pub const POLICY_INPUT_ID: &'static str = "TxtNroPoliza";
    pub const SEARCH_BUTTON_ID: &'static str = "btnConsultar";

    pub const ENDORSEMENT_ROWS: &'static str = "table#grilla > tbody > tr.jqgrow";
    pub const BRANCH_CELL: &'static str = "td[aria-describedby='grilla_cod_ramo']";
    pub const ENDORSEMENT_ID_CELL: &'static str = "td[aria-describedby='grilla_id_pv']";
    pub const ITEMS_TAB: &'static str = "a[href='#Items']";

    pub const FLEET_TABLE_ID: &'static str = "GrdItems";
    pub const FLEET_ROWS: &'static str = "table#GrdItems > tbody > tr";
    pub const FLEET_EXPORT_BUTTON: &'static str = "input#cmdExportarFlota";

    pub const SOA_LINK: &'static str = "//a[contains(text(),'certificado SOA')]";
    pub const MERCOSUR_LINK: &'static str = "//a[contains(text(),'tarjeta verde')]";
    pub const DOWNLOAD_ERROR_TAG: &'static str = "pre";

    /// Endorsement lines are numbered from the top of the grid.
    pub fn endorsement_row(line: usize) -> Locator {
        Locator::css(format!("table#grilla tr[id='{}']", line))
    }

    pub fn vehicle_detail_script(endorsement_id: &str, vehicle_id: &str) -> String {
        format!(
            "redirectPage('DetalleVehiculo.aspx', {}, {}, false)",
            endorsement_id, vehicle_id
        )
    }
}
