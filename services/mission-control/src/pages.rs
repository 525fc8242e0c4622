//! Public site: landing page, documentation and the activation wizard page

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// A documentation article
pub struct DocPage {
    pub slug: &'static str,
    pub title: &'static str,
    pub summary: &'static str,
    pub body: &'static str,
}

pub const DOCS: &[DocPage] = &[
    DocPage {
        slug: "hardware-flashing",
        title: "Flashing the tracker",
        summary: "Build the firmware, set your LoRaWAN keys and radio region, and flash the board.",
        body: r#"
<h2>What you need</h2>
<ul>
    <li>The Stratolink tracker board with its GNSS module and LoRa radio</li>
    <li>A USB data cable and a computer with PlatformIO installed</li>
    <li>The three LoRaWAN keys from your network server console</li>
</ul>
<h2>LoRaWAN keys</h2>
<p>Each tracker joins the network over the air (OTAA). Copy the
<strong>DevEUI</strong>, <strong>AppEUI</strong> (also called JoinEUI) and
<strong>AppKey</strong> from the device page of your network server into the
firmware configuration header. DevEUI and AppEUI are 8 bytes, the AppKey is
16 bytes. Keep the AppKey private; anyone holding it can impersonate your
balloon.</p>
<h2>Radio region</h2>
<p>The firmware defaults to <strong>US915</strong>. Select a different band
plan before building if you fly elsewhere:</p>
<table>
    <tr><th>Region</th><th>Where</th></tr>
    <tr><td>US915</td><td>United States, Canada (default)</td></tr>
    <tr><td>EU868</td><td>Europe</td></tr>
    <tr><td>AS923</td><td>Parts of Asia</td></tr>
    <tr><td>AU915</td><td>Australia, New Zealand</td></tr>
    <tr><td>IN865</td><td>India</td></tr>
    <tr><td>KR920</td><td>South Korea</td></tr>
</table>
<p>A balloon crosses borders. The tracker transmits with the plan it was
built for, so only gateways on that plan will hear it.</p>
<h2>Timing</h2>
<p>The GNSS receiver produces a position fix every <strong>30 seconds</strong>
and the radio transmits the latest fix every <strong>60 seconds</strong>.
The GNSS module is switched to its <strong>airborne</strong> dynamic model at
boot; in the default pedestrian model most receivers stop reporting above
12 km.</p>
<h2>Payload</h2>
<p>Each uplink carries a big-endian frame on port 1: latitude and longitude
as signed 32-bit integers in 1e-7 degrees, altitude as an unsigned 16-bit
value in metres, and optionally temperature (0.01 &deg;C), pressure
(0.1 hPa), battery (mV) and satellite count. Frames are 10 bytes without
sensors and 17 bytes with them.</p>
<h2>Flashing</h2>
<ol>
    <li>Connect the board over USB.</li>
    <li>Run <code>pio run -t upload</code> from the firmware directory.</li>
    <li>Open the serial monitor and wait for <code>JOINED</code>.</li>
</ol>
"#,
    },
    DocPage {
        slug: "cloud-setup",
        title: "Cloud setup",
        summary: "Register the tracker on the network server and point its webhook at mission control.",
        body: r#"
<h2>Register the device</h2>
<p>Create an application on The Things Stack, add an end device with
over-the-air activation, and choose the frequency plan matching the firmware
build. The console generates the DevEUI, AppEUI and AppKey used when
flashing.</p>
<h2>Webhook</h2>
<p>Add a custom webhook integration with JSON format and enable
<em>uplink message</em>. Set the base URL to this server and the uplink path
to <code>/api/webhook/lorawan</code>. If the server has a webhook secret
configured, add an <code>X-Webhook-Secret</code> header with the same
value.</p>
<p>Each delivered uplink is decoded and stored as one telemetry row. A
malformed message is answered with 400, an undecodable payload with 422 and
a storage failure with 502. Failed deliveries are not retried by mission
control.</p>
<h2>Payload formatter</h2>
<p>No formatter is required: the raw <code>frm_payload</code> is decoded on
the server. If you already use a formatter that outputs
<code>latitude</code>, <code>longitude</code> and <code>altitude</code>, it
is used when the raw payload is missing.</p>
<h2>Database</h2>
<p>Telemetry and device records live in a hosted Postgres database reached
through its REST interface. Configure the project URL and service key in the
<code>database</code> section of the server configuration.</p>
"#,
    },
];

pub fn find_doc(slug: &str) -> Option<&'static DocPage> {
    DOCS.iter().find(|d| d.slug == slug)
}

fn layout(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} - Stratolink</title>
    <style>
        .reveal {{ opacity: 0; transform: translateY(24px); transition: opacity 0.6s ease-out, transform 0.6s ease-out; }}
        .reveal.visible {{ opacity: 1; transform: none; }}
    </style>
</head>
<body style="font-family: system-ui, sans-serif; max-width: 960px; margin: 0 auto; padding: 1rem; color: #1b2733;">
    <nav style="display: flex; gap: 1rem; padding: 0.5rem 0; border-bottom: 1px solid #dee2e6;">
        <a href="/"><strong>Stratolink</strong></a>
        <a href="/docs">Docs</a>
        <a href="/activate">Activate</a>
        <a href="/mission-control">Mission control</a>
        <a href="/demo/wind">Wind demo</a>
    </nav>
    {content}
    <script>
        const observer = new IntersectionObserver(entries => {{
            entries.forEach(e => {{ if (e.isIntersecting) e.target.classList.add('visible'); }});
        }}, {{ threshold: 0.15 }});
        document.querySelectorAll('.reveal').forEach(el => observer.observe(el));
    </script>
</body>
</html>"#
    )
}

fn landing_page() -> String {
    let content = r#"
    <header class="reveal" style="padding: 4rem 0 2rem 0;">
        <h1 style="font-size: 2.5rem; margin: 0;">Follow your balloon to the edge of space</h1>
        <p style="font-size: 1.2rem;">Stratolink is an open tracker and mission control for hobbyist
        high-altitude balloons. Flash a board, launch, and watch it drift across the map.</p>
        <a href="/activate">Activate a tracker</a>
    </header>
    <section class="reveal" id="mission">
        <h2>Mission</h2>
        <p>Superpressure and latex balloons ride the stratospheric winds for hours or weeks.
        A LoRaWAN tracker reports its position every minute through community gateways, and
        mission control turns those reports into live flight paths anyone can follow.</p>
    </section>
    <section class="reveal" id="faq">
        <h2>FAQ</h2>
        <h3>Do I need my own gateway?</h3>
        <p>No. Uplinks are received by any gateway on the network that hears the balloon.</p>
        <h3>How often does the map update?</h3>
        <p>The tracker transmits every 60 seconds and the dashboard refreshes every 30 seconds.</p>
        <h3>What happens at launch?</h3>
        <p>The activation wizard checks the tracker's PIN, walks through a pre-flight checklist,
        records your launch site and marks the tracker as flying.</p>
    </section>
    <section class="reveal" id="roadmap">
        <h2>Roadmap</h2>
        <ul>
            <li>Flight prediction from forecast winds</li>
            <li>Landing alerts</li>
            <li>Multi-region firmware that follows the band plan it flies over</li>
        </ul>
    </section>
"#;
    layout("Home", content)
}

fn docs_index() -> String {
    let items: String = DOCS
        .iter()
        .map(|d| {
            format!(
                r#"<li class="reveal"><a href="/docs/{}">{}</a> - {}</li>"#,
                d.slug, d.title, d.summary
            )
        })
        .collect();
    layout(
        "Documentation",
        &format!("<h1>Documentation</h1>\n    <ul>{}</ul>", items),
    )
}

fn activation_page(hold_ms: u128) -> String {
    let content = format!(
        r#"
    <h1>Activate a tracker</h1>
    <ol id="steps" style="display: flex; gap: 1rem; list-style: none; padding: 0;">
        <li data-step="credentials">1. Credentials</li>
        <li data-step="hardware_check">2. Hardware</li>
        <li data-step="location_lock">3. Location</li>
        <li data-step="confirm">4. Launch</li>
    </ol>
    <p id="error" style="color: #b00020;"></p>
    <section data-panel="credentials">
        <label>Device ID <input id="device-id" autocomplete="off"></label>
        <label>PIN <input id="pin" inputmode="numeric" maxlength="6" type="password"></label>
        <button onclick="start()">Continue</button>
    </section>
    <section data-panel="hardware_check" hidden>
        <label><input type="checkbox" id="antenna_attached"> Antenna attached</label><br>
        <label><input type="checkbox" id="battery_charged"> Battery charged</label><br>
        <label><input type="checkbox" id="gps_sky_view"> GPS has a clear view of the sky</label><br>
        <label><input type="checkbox" id="payload_sealed"> Payload sealed</label><br>
        <button onclick="back()">Back</button>
        <button onclick="hardware()">Continue</button>
    </section>
    <section data-panel="location_lock" hidden>
        <p id="fix">Waiting for a location fix...</p>
        <button onclick="back()">Back</button>
        <button onclick="locate()">Lock location</button>
    </section>
    <section data-panel="confirm" hidden>
        <p>Hold the button for {hold_seconds} seconds to launch.</p>
        <button onclick="back()">Back</button>
        <button id="hold" style="padding: 1rem 2rem;">Hold to launch</button>
    </section>
    <section data-panel="complete" hidden>
        <h2>Launched!</h2>
        <p><a id="follow-link" href="/mission-control">Follow it in mission control</a></p>
    </section>
    <script>
        const HOLD_MS = {hold_ms};
        let session = null;

        function show(step) {{
            document.querySelectorAll('[data-panel]').forEach(p => p.hidden = p.dataset.panel !== step);
            document.querySelectorAll('[data-step]').forEach(s => s.style.fontWeight = s.dataset.step === step ? 'bold' : 'normal');
        }}

        function call(path, body) {{
            document.getElementById('error').textContent = '';
            return fetch(path, {{
                method: 'POST',
                headers: {{ 'content-type': 'application/json' }},
                body: JSON.stringify(body || {{}})
            }}).then(r => r.json().then(data => {{
                if (!r.ok) throw new Error(data.error);
                return data;
            }})).then(data => {{
                session = data;
                show(data.step);
                return data;
            }}).catch(e => document.getElementById('error').textContent = e.message);
        }}

        function start() {{
            const deviceId = document.getElementById('device-id').value;
            const pin = document.getElementById('pin').value;
            // after going back, re-enter the PIN on the open session
            if (session && session.step === 'credentials' && session.device_id === deviceId) {{
                call('/api/activation/sessions/' + session.id + '/credentials', {{ pin: pin }});
            }} else {{
                call('/api/activation/sessions', {{ device_id: deviceId, pin: pin }});
            }}
        }}

        function hardware() {{
            const body = {{}};
            ['antenna_attached', 'battery_charged', 'gps_sky_view', 'payload_sealed']
                .forEach(k => body[k] = document.getElementById(k).checked);
            call('/api/activation/sessions/' + session.id + '/hardware', body);
        }}

        function locate() {{
            navigator.geolocation.getCurrentPosition(pos => {{
                document.getElementById('fix').textContent =
                    pos.coords.latitude.toFixed(5) + ', ' + pos.coords.longitude.toFixed(5) +
                    ' (+/- ' + Math.round(pos.coords.accuracy) + ' m)';
                call('/api/activation/sessions/' + session.id + '/location', {{
                    latitude: pos.coords.latitude,
                    longitude: pos.coords.longitude,
                    accuracy_m: pos.coords.accuracy
                }});
            }}, err => document.getElementById('error').textContent = err.message,
            {{ enableHighAccuracy: true }});
        }}

        function back() {{
            call('/api/activation/sessions/' + session.id + '/back');
        }}

        let pressedAt = null;
        const hold = document.getElementById('hold');
        hold.addEventListener('pointerdown', () => pressedAt = Date.now());
        hold.addEventListener('pointerup', () => {{
            if (pressedAt === null) return;
            const held = Date.now() - pressedAt;
            pressedAt = null;
            call('/api/activation/sessions/' + session.id + '/confirm', {{ held_ms: held }})
                .then(data => {{
                    if (data && data.device) {{
                        document.getElementById('follow-link').href =
                            '/mission-control?follow=' + encodeURIComponent(data.device.id);
                    }}
                }});
        }});
        show('credentials');
    </script>
"#,
        hold_ms = hold_ms,
        hold_seconds = (hold_ms as f64 / 1000.0),
    );
    layout("Activate", &content)
}

async fn landing_handler() -> impl IntoResponse {
    Html(landing_page())
}

async fn docs_index_handler() -> impl IntoResponse {
    Html(docs_index())
}

async fn doc_handler(Path(slug): Path<String>) -> Response {
    match find_doc(&slug) {
        Some(doc) => Html(layout(
            doc.title,
            &format!(
                r#"<article class="reveal"><h1>{}</h1>{}</article>"#,
                doc.title, doc.body
            ),
        ))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Html(layout(
                "Not found",
                r#"<h1>Page not found</h1><p><a href="/docs">Back to the documentation</a></p>"#,
            )),
        )
            .into_response(),
    }
}

async fn activate_handler(State(app): State<AppState>) -> impl IntoResponse {
    Html(activation_page(
        app.config.activation.hold_duration.as_millis(),
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(landing_handler))
        .route("/docs", get(docs_index_handler))
        .route("/docs/{slug}", get(doc_handler))
        .route("/activate", get(activate_handler))
}
