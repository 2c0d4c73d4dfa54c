pub type Endpoint = str;

pub const LOGIN_URL: &Endpoint = "https://www.obi.de/regi/auth/api/public/login";
pub const API_URL: &Endpoint = "https://energy-tracking-backend.prod-eks.dbs.obi.solutions";

pub const USERS: &Endpoint = "/users";
pub const HISTORICAL_DATA: &Endpoint = "/historical-data";
pub const TOTAL: &Endpoint = "total";
pub const HOURLY: &Endpoint = "hourly";
pub const METER: &Endpoint = "meter";

pub const USER_MEDIA_TYPE: &str = "application/vnd.obi.companion.energy-tracking.user.v1+json";
pub const HISTORICAL_RECORD_MEDIA_TYPE: &str =
    "application/vnd.obi.companion.energy-tracking.historical-record.v1+json";

pub const LOGIN_USER_AGENT: &str = "heyOBI APP / Android Phone 30";
pub const APP_USER_AGENT: &str = "app_client";
