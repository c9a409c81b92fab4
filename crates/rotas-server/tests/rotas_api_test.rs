mod common;

use actix_web::test;
use chrono::DateTime;
use serde_json::{Value, json};

use common::*;

#[actix_web::test]
async fn test_dashboard_requires_app_access() {
    let app = create_test_app().await;

    let req = test::TestRequest::get()
        .uri("/api/rotas/dashboard")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "unauthorized");

    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", "bogus")).await;
    assert_eq!(resp.status(), 401);

    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", READER_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);

    // Token in the query string and in the accessToken header also count.
    let req = test::TestRequest::get()
        .uri(&format!("/api/rotas/dashboard?token={}", STAFF_TOKEN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let req = test::TestRequest::get()
        .uri("/api/rotas/dashboard")
        .insert_header(("accessToken", READER_TOKEN))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_dashboard_reports_missing_config() {
    let app = create_test_app_with(create_unconfigured_state()).await;

    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", STAFF_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["config_missing"], true);
    assert_eq!(body["rotas"].as_array().unwrap().len(), 0);
}

#[actix_web::test]
async fn test_dashboard_route_flags() {
    let app = create_test_app().await;

    let batch = json!([
        rota_item("BEN01_LIGAR", "BEN01_LIGAR", json!(1), &minutes_ago(30)),
        rota_item("BEN01_LIGADA", "BEN01_LIGADA", json!(1), &minutes_ago(20)),
        rota_item("BEN01_DESLIGAR", "BEN01_DESLIGAR", json!(0), &minutes_ago(18)),
        rota_item("MOE01_LIGAR", "MOE01_LIGAR", json!(1), &minutes_ago(25)),
        rota_item("TRA01_LIGAR", "TRA01_LIGAR", json!(1), &minutes_ago(40)),
        rota_item("TRA01_LIGADA", "TRA01_LIGADA", json!(1), &minutes_ago(38)),
        rota_item("TRA01_DESLIGAR", "TRA01_DESLIGAR", json!(1), &minutes_ago(5)),
        // Unparseable payloads must not break the dashboard.
        {
            "source_id": "JUNK01",
            "client_id": CLIENT_ID,
            "agent_id": ROTAS_AGENT,
            "source": "telemetria_rotas",
            "payload": {"Foo": "bar"}
        },
    ]);
    let resp = test::call_service(&app, ingest_request(&batch)).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", READER_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["config_missing"], false);

    let rotas = body["rotas"].as_array().unwrap();
    assert_eq!(rotas.len(), 3);

    assert_eq!(rotas[0]["prefixo"], "BEN01");
    assert_eq!(rotas[0]["play_on"], true);
    assert_eq!(rotas[0]["play_blink"], false);
    assert_eq!(rotas[0]["pause_on"], false);
    assert_eq!(rotas[0]["context_status"], "Linha ligada");

    assert_eq!(rotas[1]["prefixo"], "MOE01");
    assert_eq!(rotas[1]["play_blink"], true);
    assert_eq!(rotas[1]["context_status"], "Estado indefinido");

    assert_eq!(rotas[2]["prefixo"], "TRA01");
    assert_eq!(rotas[2]["pause_on"], true);
    assert_eq!(rotas[2]["play_on"], false);

    assert_eq!(body["total_rotas"], 3);
    assert_eq!(body["rotas_ativas"], 3);
    assert_eq!(body["conectado"], false);

    // Newest event first, the junk record contributes none.
    assert_eq!(body["eventos"]["total_count"], 7);
    let first = &body["eventos"]["page_items"][0];
    assert_eq!(first["prefixo"], "TRA01");
    assert_eq!(first["atributo"], "DESLIGAR");

    let timeline = body["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 7);
    assert_eq!(body["selected_index"], 6);

    assert_eq!(body["intervalos"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_dashboard_scrub_instant() {
    let app = create_test_app().await;

    let batch = json!([
        rota_item("BEN01_LIGAR", "BEN01_LIGAR", json!(1), &minutes_ago(40)),
        rota_item("BEN01_LIGADA", "BEN01_LIGADA", json!(1), &minutes_ago(38)),
        rota_item("TRA01_LIGAR", "TRA01_LIGAR", json!(1), &minutes_ago(30)),
        rota_item("TRA01_LIGADA", "TRA01_LIGADA", json!(1), &minutes_ago(25)),
        rota_item("BEN01_DESLIGAR", "BEN01_DESLIGAR", json!(0), &minutes_ago(18)),
        rota_item("TRA01_DESLIGAR", "TRA01_DESLIGAR", json!(1), &minutes_ago(5)),
    ]);
    let resp = test::call_service(&app, ingest_request(&batch)).await;
    assert_eq!(resp.status(), 200);

    // Before the stop command TRA01 still reads as running.
    let uri = format!("/api/rotas/dashboard?at={}", minutes_ago(10));
    let resp = test::call_service(&app, get_request(&uri, READER_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;

    let rotas = body["rotas"].as_array().unwrap();
    assert_eq!(rotas.len(), 2);
    assert_eq!(rotas[1]["prefixo"], "TRA01");
    assert_eq!(rotas[1]["play_on"], true);
    assert_eq!(rotas[1]["pause_on"], false);

    // Snapped to the last instant at or before the requested one.
    assert_eq!(body["selected_index"], 4);
    assert_eq!(body["eventos"]["total_count"], 5);

    // At the present the stop command wins.
    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", READER_TOKEN)).await;
    let body: Value = test::read_body_json(resp).await;
    let rotas = body["rotas"].as_array().unwrap();
    assert_eq!(rotas[1]["pause_on"], true);
    assert_eq!(rotas[1]["play_on"], false);
}

#[actix_web::test]
async fn test_dashboard_busca_and_inactive_filter() {
    let app = create_test_app().await;

    let map = json!({"tipo": "ORIGEM", "codigo": 3, "nome": "Silo A"});
    let resp = test::call_service(&app, post_json("/api/rotas/maps", STAFF_TOKEN, &map)).await;
    assert_eq!(resp.status(), 200);

    let batch = json!([
        rota_item("BEN01_LIGAR", "BEN01_LIGAR", json!(1), &minutes_ago(30)),
        rota_item("BEN01_ORIGEM", "BEN01_ORIGEM", json!(3), &minutes_ago(25)),
        rota_item("INA01_LIGAR", "INA01_LIGAR", json!(0), &minutes_ago(10)),
    ]);
    let resp = test::call_service(&app, ingest_request(&batch)).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", READER_TOKEN)).await;
    let body: Value = test::read_body_json(resp).await;
    let rotas = body["rotas"].as_array().unwrap();
    assert_eq!(rotas.len(), 1);
    assert_eq!(rotas[0]["prefixo"], "BEN01");
    assert_eq!(rotas[0]["origem_codigo"], 3);
    assert_eq!(rotas[0]["origem_display"], "Silo A");
    assert_eq!(body["total_rotas"], 2);
    assert_eq!(body["rotas_ativas"], 1);

    let resp = test::call_service(
        &app,
        get_request("/api/rotas/dashboard?mostrar_inativas=1", READER_TOKEN),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    let rotas = body["rotas"].as_array().unwrap();
    assert_eq!(rotas.len(), 2);
    assert_eq!(rotas[1]["prefixo"], "INA01");
    assert_eq!(rotas[1]["is_inactive"], true);

    // Terms are comma separated and match prefix or endpoint names.
    let resp = test::call_service(
        &app,
        get_request("/api/rotas/dashboard?busca=silo", READER_TOKEN),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["rotas"].as_array().unwrap().len(), 1);

    let resp = test::call_service(
        &app,
        get_request("/api/rotas/dashboard?busca=xyz", READER_TOKEN),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["rotas"].as_array().unwrap().len(), 0);

    let resp = test::call_service(
        &app,
        get_request("/api/rotas/dashboard?busca=xyz,ben", READER_TOKEN),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["rotas"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_dashboard_timeline_downsample() {
    let mut state = create_test_state();
    state.timeline_limit = 5;
    let app = create_test_app_with(state).await;

    let instants: Vec<String> = (0..12).map(|i| minutes_ago(60 - i * 2)).collect();
    let items: Vec<Value> = instants
        .iter()
        .enumerate()
        .map(|(i, ts)| rota_item(&format!("BEN01_LIGAR_{i:02}"), "BEN01_LIGAR", json!(1), ts))
        .collect();
    let resp = test::call_service(&app, ingest_request(&json!(items))).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["count"], 12);

    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", STAFF_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;

    // 12 instants with a budget of 5: every second point plus the forced
    // final instant.
    let timeline = body["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 7);
    assert_eq!(body["selected_index"], 6);

    let last = timeline.last().unwrap()["timestamp"].as_str().unwrap();
    let got = DateTime::parse_from_rfc3339(last).unwrap();
    let expected = DateTime::parse_from_rfc3339(instants.last().unwrap()).unwrap();
    assert_eq!(got, expected);

    assert_eq!(body["eventos"]["total_count"], 12);
    assert_eq!(body["eventos"]["page_items"].as_array().unwrap().len(), 10);
    assert_eq!(body["eventos"]["pages_available"], 2);

    let resp = test::call_service(
        &app,
        get_request("/api/rotas/dashboard?events_page=2", STAFF_TOKEN),
    )
    .await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["eventos"]["page_number"], 2);
    assert_eq!(body["eventos"]["page_items"].as_array().unwrap().len(), 2);
}

#[actix_web::test]
async fn test_route_detail_state_and_changelog() {
    let app = create_test_app().await;

    for map in [
        json!({"tipo": "ORIGEM", "codigo": 3, "nome": "Silo A"}),
        json!({"tipo": "DESTINO", "codigo": 7, "nome": "Moega B"}),
    ] {
        let resp = test::call_service(&app, post_json("/api/rotas/maps", STAFF_TOKEN, &map)).await;
        assert_eq!(resp.status(), 200);
    }

    let batch = json!([
        rota_item("BEN01_LIGAR_A", "BEN01_LIGAR", json!(1), &minutes_ago(40)),
        rota_item("BEN01_DESLIGAR", "BEN01_DESLIGAR", json!(0), &minutes_ago(35)),
        rota_item("BEN01_LIGADA", "BEN01_LIGADA", json!(1), &minutes_ago(30)),
        rota_item("BEN01_ORIGEM", "BEN01_ORIGEM", json!(3), &minutes_ago(20)),
        rota_item("BEN01_DESTINO", "BEN01_DESTINO", json!(7), &minutes_ago(15)),
        rota_item("BEN01_LIGAR_B", "BEN01_LIGAR", json!(1), &minutes_ago(10)),
    ]);
    let resp = test::call_service(&app, ingest_request(&batch)).await;
    assert_eq!(resp.status(), 200);

    // Prefix lookups are case insensitive.
    let resp = test::call_service(&app, get_request("/api/rotas/routes/ben01", READER_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["prefixo"], "BEN01");
    assert_eq!(body["nome_exibicao"], "BEN01");
    assert!(body["config"].is_null());

    assert_eq!(body["play_on"], true);
    assert_eq!(body["pause_on"], false);
    assert_eq!(body["is_inactive"], false);
    assert_eq!(body["context_status"], "Linha ligada");
    assert!(!body["last_update"].is_null());

    let atributos = body["atributos"].as_array().unwrap();
    let expected = [
        ("LIGAR", "1"),
        ("DESLIGAR", "0"),
        ("LIGADA", "1"),
        ("ORIGEM", "Silo A (3)"),
        ("DESTINO", "Moega B (7)"),
    ];
    assert_eq!(atributos.len(), expected.len());
    for (row, (atributo, valor)) in atributos.iter().zip(expected) {
        assert_eq!(row["atributo"], atributo);
        assert_eq!(row["valor_display"], valor);
    }

    let rows = body["eventos"]["page_items"].as_array().unwrap();
    assert_eq!(body["eventos"]["total_count"], 6);
    assert_eq!(rows[0]["atributo"], "LIGAR");
    assert_eq!(rows[0]["changed"], true);
    assert_eq!(rows[0]["is_command"], true);
    assert_eq!(rows[1]["atributo"], "DESTINO");
    assert_eq!(rows[1]["valor_display"], "Moega B (7)");
    assert_eq!(rows[1]["is_command"], false);
    // The older repeat of the same command did not change the value.
    assert_eq!(rows[5]["atributo"], "LIGAR");
    assert_eq!(rows[5]["changed"], false);

    assert_eq!(body["timeline"].as_array().unwrap().len(), 6);
    assert_eq!(body["selected_index"], 5);
    assert_eq!(body["intervalos"].as_array().unwrap().len(), 1);

    // Scrubbed back before the endpoint codes arrived.
    let uri = format!("/api/rotas/routes/BEN01?at={}", minutes_ago(25));
    let resp = test::call_service(&app, get_request(&uri, READER_TOKEN)).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["selected_index"], 2);
    assert_eq!(body["context_status"], "Linha ligada");
    let atributos = body["atributos"].as_array().unwrap();
    assert_eq!(atributos[3]["valor_display"], "-");
    assert_eq!(atributos[4]["valor_display"], "-");
    assert_eq!(body["eventos"]["total_count"], 3);
}

#[actix_web::test]
async fn test_route_detail_unknown_prefix() {
    let app = create_test_app().await;

    let resp = test::call_service(&app, get_request("/api/rotas/routes/zz999", READER_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["prefixo"], "ZZ999");
    assert_eq!(body["context_status"], "Estado indefinido");
    assert_eq!(body["is_inactive"], true);
    assert_eq!(body["selected_index"], -1);
    assert_eq!(body["eventos"]["total_count"], 0);
    assert_eq!(body["timeline"].as_array().unwrap().len(), 0);
    assert!(body["last_update"].is_null());
    for row in body["atributos"].as_array().unwrap() {
        assert_eq!(row["valor_display"], "-");
    }
}

#[actix_web::test]
async fn test_save_route_config_and_order() {
    let app = create_test_app().await;

    let payload = json!({"nome_exibicao": "Correia Norte", "ordem": 2, "ativo": true});
    let resp = test::call_service(
        &app,
        post_json("/api/rotas/routes/ben01/config", READER_TOKEN, &payload),
    )
    .await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["config"]["prefixo"], "BEN01");
    assert_eq!(body["config"]["nome_exibicao"], "Correia Norte");
    assert_eq!(body["config"]["ordem"], 2);
    assert_eq!(body["config"]["ativo"], true);

    // Omitted and null fields keep their stored value.
    for payload in [json!({}), json!({"nome_exibicao": null, "ordem": null, "ativo": null})] {
        let resp = test::call_service(
            &app,
            post_json("/api/rotas/routes/BEN01/config", READER_TOKEN, &payload),
        )
        .await;
        assert_eq!(resp.status(), 200);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["config"]["nome_exibicao"], "Correia Norte");
        assert_eq!(body["config"]["ordem"], 2);
    }

    for payload in [
        json!({"nome_exibicao": 42}),
        json!({"ordem": "abc"}),
        json!({"ativo": "yes"}),
    ] {
        let resp = test::call_service(
            &app,
            post_json("/api/rotas/routes/BEN01/config", READER_TOKEN, &payload),
        )
        .await;
        assert_eq!(resp.status(), 400, "payload: {payload}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "invalid_payload");
    }

    let batch = json!([
        rota_item("BEN01_LIGAR", "BEN01_LIGAR", json!(1), &minutes_ago(20)),
        rota_item("MOE01_LIGAR", "MOE01_LIGAR", json!(1), &minutes_ago(15)),
    ]);
    let resp = test::call_service(&app, ingest_request(&batch)).await;
    assert_eq!(resp.status(), 200);

    // Ordered routes come before unordered ones.
    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", READER_TOKEN)).await;
    let body: Value = test::read_body_json(resp).await;
    let rotas = body["rotas"].as_array().unwrap();
    assert_eq!(rotas[0]["prefixo"], "BEN01");
    assert_eq!(rotas[0]["titulo"], "Correia Norte");
    assert_eq!(rotas[1]["prefixo"], "MOE01");

    // Reorder normalizes case and drops repeats before applying.
    let order = json!(["moe01", " ben01 ", "MOE01"]);
    let resp = test::call_service(&app, post_json("/api/rotas/order", READER_TOKEN, &order)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["changed"], 1);

    let resp = test::call_service(&app, get_request("/api/rotas/dashboard", READER_TOKEN)).await;
    let body: Value = test::read_body_json(resp).await;
    let rotas = body["rotas"].as_array().unwrap();
    assert_eq!(rotas[0]["prefixo"], "MOE01");
    assert_eq!(rotas[1]["prefixo"], "BEN01");

    let cases = [
        (json!("nope"), "invalid_prefix_list"),
        (json!([42]), "invalid_prefix_list"),
        (json!(["  "]), "invalid_prefix_list"),
        (json!([]), "empty_prefix_list"),
    ];
    for (payload, error) in &cases {
        let resp =
            test::call_service(&app, post_json("/api/rotas/order", READER_TOKEN, payload)).await;
        assert_eq!(resp.status(), 400, "payload: {payload}");
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(&body["error"], error);
    }

    let req = test::TestRequest::post()
        .uri("/api/rotas/order")
        .insert_header(("Authorization", format!("Bearer {}", READER_TOKEN)))
        .set_payload("{broken")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "invalid_json");
}

#[actix_web::test]
async fn test_connection_lifebit() {
    let app = create_test_app().await;

    let resp = test::call_service(&app, get_request("/api/rotas/connection", READER_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["conectado"], false);
    assert_eq!(body["conexao_display"], "--");
    assert_eq!(body["lifebits"].as_array().unwrap().len(), 0);

    let batch = json!([rota_item("LIFEBIT", "LIFEBIT", json!(1), &minutes_ago(0))]);
    let resp = test::call_service(&app, ingest_request(&batch)).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, get_request("/api/rotas/connection", READER_TOKEN)).await;
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["conectado"], true);
    let lifebits = body["lifebits"].as_array().unwrap();
    assert_eq!(lifebits.len(), 1);
    assert_eq!(lifebits[0]["source_id"], "LIFEBIT");
}

#[actix_web::test]
async fn test_records_filters() {
    let app = create_test_app().await;

    let batch = json!([
        rota_item("BEN01_LIGAR", "BEN01_LIGAR", json!(1), &minutes_ago(30)),
        rota_item("MOE01_DESLIGAR", "MOE01_DESLIGAR", json!(1), &minutes_ago(20)),
        {
            "source_id": "JUNK01",
            "client_id": CLIENT_ID,
            "agent_id": ROTAS_AGENT,
            "source": "telemetria_rotas",
            "payload": {"Foo": "bar"}
        },
    ]);
    let resp = test::call_service(&app, ingest_request(&batch)).await;
    assert_eq!(resp.status(), 200);

    let resp = test::call_service(&app, get_request("/api/rotas/records", READER_TOKEN)).await;
    assert_eq!(resp.status(), 200);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["total_geral"], 3);
    assert_eq!(body["total_fonte"], 3);
    assert_eq!(body["sample_total"], 3);
    assert_eq!(body["sample_ok"], 2);

    let cases = [
        ("prefixo=ben01", 1),
        ("atributo=ligar", 1),
        ("atributo=desligar", 1),
        ("tag=ligar", 2),
        ("valor=1", 2),
        ("source=telemetria", 3),
        ("source_id=junk", 1),
    ];
    for (qs, count) in cases {
        let uri = format!("/api/rotas/records?{qs}");
        let resp = test::call_service(&app, get_request(&uri, READER_TOKEN)).await;
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(
            body["registros"]["page_items"].as_array().unwrap().len(),
            count,
            "query: {qs}"
        );
    }
}
