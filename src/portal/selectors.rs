//! Element locations on the employee document portal.

use crate::browser::Selector;
use crate::models::PeriodFilter;

const FILTER_DROPDOWN: &str = "//ul[@class='nav navbar-nav']/li[2]/a[@data-toggle='dropdown'][1]";
const ROW_GROUP: &str = "//tbody[@role='rowgroup']";

pub fn client_number_field() -> Selector {
    Selector::id("ClientNumber")
}

pub fn username_field() -> Selector {
    Selector::id("Username")
}

pub fn password_field() -> Selector {
    Selector::id("Password")
}

pub fn login_button() -> Selector {
    Selector::xpath("//button[@value='login']")
}

/// Rendered once the documents view has loaded.
pub fn module_menu() -> Selector {
    Selector::xpath("//md-part-modulemenu[@data-part='menu']")
}

pub fn filter_label() -> Selector {
    Selector::xpath(format!("{}/div/span[@class='dropdown-toggle-label']", FILTER_DROPDOWN))
}

pub fn filter_close() -> Selector {
    Selector::xpath(format!("{}/div/span[@title='close']", FILTER_DROPDOWN))
}

pub fn filter_dropdown() -> Selector {
    Selector::xpath(FILTER_DROPDOWN)
}

pub fn filter_entry(filter: PeriodFilter) -> Selector {
    Selector::xpath(format!(
        "//ul[@class='nav navbar-nav']/li[2]/ul/li/a[@data-i18n='app:modules.documentstorage.{}']",
        filter.menu_command()
    ))
}

pub fn document_rows() -> Selector {
    Selector::xpath("//div[@class='k-grid-content k-auto-scrollable']/table/tbody/tr")
}

/// `index` is 1-based, as in XPath.
pub fn document_row(index: usize) -> Selector {
    Selector::xpath(format!("{}/tr[{}]", ROW_GROUP, index))
}

/// The actions menu always belongs to the first row once a document is opened.
pub fn actions_button() -> Selector {
    Selector::xpath(format!("{}/tr[1]/td/div/wk-dropdown/button[@type='button']", ROW_GROUP))
}

pub fn download_entry() -> Selector {
    Selector::xpath(format!(
        "{}/tr[1]/td/div/wk-dropdown/wk-dropdown-menu/render-target/div/slot/dl/dd[3]/button",
        ROW_GROUP
    ))
}

pub fn breadcrumb_home() -> Selector {
    Selector::xpath("//nav[@class='wk-breadcrumb wk-breadcrumb-full']/ol/li[1]/a")
}
