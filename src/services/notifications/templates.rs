use chrono::NaiveDate;

use super::{BookingNotice, NotificationSettings};
use crate::services::phone;

/// `Monday, June 16, 2025`
pub fn format_date(date: &NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// `14:30` renders as `2:00 PM`; minutes are dropped. Unparseable input is
/// returned unchanged.
pub fn format_time(time: &str) -> String {
    let Some(hour) = time.split(':').next().and_then(|h| h.trim().parse::<u32>().ok()) else {
        return time.to_string();
    };
    let period = if hour >= 12 { "PM" } else { "AM" };
    let display_hour = match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    format!("{display_hour}:00 {period}")
}

fn when_date(notice: &BookingNotice) -> String {
    notice
        .date
        .as_ref()
        .map(format_date)
        .unwrap_or_else(|| "To be scheduled".to_string())
}

fn when_time(notice: &BookingNotice) -> String {
    notice
        .time
        .as_deref()
        .map(format_time)
        .unwrap_or_else(|| "We will contact you".to_string())
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn owner_sms(notice: &BookingNotice) -> String {
    let email_line = notice
        .email
        .as_deref()
        .map(|e| format!("Email: {e}\n"))
        .unwrap_or_default();

    format!(
        "New booking received!\n\n\
         Service: {} - ${}\n\
         Date: {} at {}\n\
         Location: {}, {} {} {}\n\n\
         Customer: {}\n\
         Phone: {}\n\
         {email_line}\n\
         Note: Vehicle details not collected - follow up via SMS",
        notice.service_name,
        notice.price,
        when_date(notice),
        when_time(notice),
        notice.address.street,
        notice.address.city,
        notice.address.state,
        notice.address.zip,
        notice.customer_name,
        phone::display(&notice.phone),
    )
}

pub fn customer_sms(settings: &NotificationSettings, notice: &BookingNotice) -> String {
    format!(
        "Thanks for booking with {}!\n\n\
         Your {} is scheduled for:\n\
         {} at {}\n\
         {}, {}\n\n\
         We'll text you 24 hours before to confirm your vehicle details (make, model, year).\n\n\
         Questions? Reply to this text or call {}.",
        settings.business_name,
        notice.service_name,
        when_date(notice),
        when_time(notice),
        notice.address.street,
        notice.address.city,
        phone::display(&settings.business_phone),
    )
}

/// Returns `(subject, html)`.
pub fn owner_email(notice: &BookingNotice) -> (String, String) {
    let subject = format!("New Booking: {} - {}", notice.service_name, when_date(notice));
    let email_line = notice
        .email
        .as_deref()
        .map(|e| format!("<br><strong>Email:</strong> {}", escape_html(e)))
        .unwrap_or_default();

    let html = format!(
        "<h2>New Booking Received!</h2>\
         <h3>Service Details</h3>\
         <p><strong>Service:</strong> {service}<br><strong>Price:</strong> ${price}</p>\
         <h3>Schedule</h3>\
         <p><strong>Date:</strong> {date}<br><strong>Time:</strong> {time}</p>\
         <h3>Location</h3>\
         <p>{street}<br>{city}, {state} {zip}</p>\
         <h3>Customer</h3>\
         <p><strong>Name:</strong> {name}<br><strong>Phone:</strong> {phone}{email_line}</p>\
         <p style=\"color: #666; margin-top: 20px;\"><em>Note: Vehicle details not collected - \
         follow up with customer to confirm make, model, and year.</em></p>",
        service = escape_html(&notice.service_name),
        price = notice.price,
        date = when_date(notice),
        time = when_time(notice),
        street = escape_html(&notice.address.street),
        city = escape_html(&notice.address.city),
        state = escape_html(&notice.address.state),
        zip = escape_html(&notice.address.zip),
        name = escape_html(&notice.customer_name),
        phone = phone::display(&notice.phone),
    );
    (subject, html)
}

pub fn customer_email(settings: &NotificationSettings, notice: &BookingNotice) -> (String, String) {
    let subject = format!("Booking Confirmed - {}", notice.service_name);
    let html = format!(
        "<h2>Thanks for booking with {business}!</h2>\
         <p>Your <strong>{service}</strong> is scheduled for:</p>\
         <p style=\"font-size: 16px;\"><strong>{date}</strong> at <strong>{time}</strong><br>{street}, {city}</p>\
         <p>We'll contact you 24 hours before your appointment to confirm your vehicle details \
         (make, model, year).</p>\
         <p style=\"margin-top: 30px;\"><strong>Questions?</strong><br>\
         Call or text: <a href=\"tel:{tel}\">{phone}</a></p>",
        business = escape_html(&settings.business_name),
        service = escape_html(&notice.service_name),
        date = when_date(notice),
        time = when_time(notice),
        street = escape_html(&notice.address.street),
        city = escape_html(&notice.address.city),
        tel = settings.business_phone,
        phone = phone::display(&settings.business_phone),
    );
    (subject, html)
}

pub fn promo_confirmation_email(
    settings: &NotificationSettings,
    name: &str,
    service_name: &str,
    promo_code: &str,
) -> (String, String) {
    let subject = format!("You're all set! {service_name}");
    let html = format!(
        "<h2>Thanks for claiming your free wash, {name}!</h2>\
         <p>We've received your request for a <strong>{service}</strong>.</p>\
         <h3>What's Next?</h3>\
         <ol>\
         <li>We'll contact you within <strong>24 hours</strong> to schedule your service</li>\
         <li>We'll confirm your vehicle details (make, model, year)</li>\
         <li>You pick a convenient date and time</li>\
         <li>We come to you and handle the rest!</li>\
         </ol>\
         <p style=\"background: #f8f8f8; border-left: 4px solid #c41e3a; padding: 1rem;\">\
         <strong>Promo Code:</strong> {code}<br><strong>Service:</strong> {service}</p>\
         <p style=\"margin-top: 30px;\"><strong>Questions?</strong><br>\
         Call or text: <a href=\"tel:{tel}\">{phone}</a></p>\
         <p style=\"color: #666;\">- The {business} Team</p>",
        name = escape_html(name),
        service = escape_html(service_name),
        code = escape_html(&promo_code.to_uppercase()),
        tel = settings.business_phone,
        phone = phone::display(&settings.business_phone),
        business = escape_html(&settings.business_name),
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifications::NoticeAddress;

    fn notice() -> BookingNotice {
        BookingNotice {
            service_name: "The \"Showroom\"".to_string(),
            price: 214,
            date: NaiveDate::from_ymd_opt(2025, 6, 16),
            time: Some("14:30".to_string()),
            address: NoticeAddress {
                street: "123 Palm Ave".to_string(),
                city: "Weston".to_string(),
                state: "FL".to_string(),
                zip: "33326".to_string(),
            },
            customer_name: "Alice <script>".to_string(),
            phone: "9545551234".to_string(),
            email: Some("alice@example.com".to_string()),
        }
    }

    #[test]
    fn test_format_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
        assert_eq!(format_date(&date), "Monday, June 16, 2025");
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        assert_eq!(format_date(&date), "Sunday, January 5, 2025");
    }

    #[test]
    fn test_format_time_uses_hour_only() {
        assert_eq!(format_time("14:30"), "2:00 PM");
        assert_eq!(format_time("09:00"), "9:00 AM");
        assert_eq!(format_time("00:15"), "12:00 AM");
        assert_eq!(format_time("12:00"), "12:00 PM");
        assert_eq!(format_time("noon"), "noon");
    }

    #[test]
    fn test_owner_sms_contents() {
        let body = owner_sms(&notice());
        assert!(body.contains("Service: The \"Showroom\" - $214"));
        assert!(body.contains("Date: Monday, June 16, 2025 at 2:00 PM"));
        assert!(body.contains("Phone: 954-555-1234"));
        assert!(body.contains("Email: alice@example.com"));
    }

    #[test]
    fn test_unscheduled_notice_placeholders() {
        let mut n = notice();
        n.date = None;
        n.time = None;
        let body = owner_sms(&n);
        assert!(body.contains("Date: To be scheduled at We will contact you"));
    }

    #[test]
    fn test_owner_email_escapes_customer_input() {
        let (subject, html) = owner_email(&notice());
        assert_eq!(subject, "New Booking: The \"Showroom\" - Monday, June 16, 2025");
        assert!(html.contains("Alice &lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }
}
