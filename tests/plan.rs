use graphconn::view::table;
use graphconn::{Op, Stats, StmtType};
use serde_json::json;

fn profiled() -> Stats {
    Stats {
        plan: "PROFILE".into(),
        statement: StmtType::try_from(2).unwrap(),
        version: "CYPHER 5".into(),
        planner: "COST".into(),
        runtime: "PIPELINED".into(),
        time: 4,
        db_hits: 1,
        rows: 1,
        memory: 184,
    }
}

#[test]
fn stats_serialize_statement_label() {
    let json = serde_json::to_value(profiled()).unwrap();
    assert_eq!(json["queryType"], "READ_WRITE");
    assert_eq!(json["dbHits"], 1);

    let back: Stats = serde_json::from_value(json).unwrap();
    assert_eq!(back, profiled());
}

#[test]
fn stats_table_uses_labels() {
    let (headers, rows) = table(&[profiled()]);
    assert_eq!(headers[1], "Statement");
    assert_eq!(rows[0][1], "READ_WRITE");
    assert_eq!(profiled().to_string(), "PROFILE (4 ms, 1 rows, 1 DB hits)");
}

#[test]
fn op_tree_deserializes_from_server_names() {
    let root: Op = serde_json::from_value(json!({
        "operatorType": "ProduceResults",
        "estimatedRows": 1,
        "rows": 1,
        "dbHits": 0,
        "memory": 0,
        "pageCacheHits": 0,
        "pageCacheMisses": 0,
        "children": [{
            "operatorType": "NodeIndexSeek",
            "details": "p:Person(id) WHERE id = $id",
            "estimatedRows": 1,
            "rows": 1,
            "dbHits": 2,
            "memory": 0,
            "pageCacheHits": 3,
            "pageCacheMisses": 0,
            "order": "p.id ASC"
        }]
    }))
    .unwrap();

    assert_eq!(root.total_db_hits(), 2);
    assert_eq!(root.children[0].rows_est, 1);
    assert_eq!(root.children[0].order.as_deref(), Some("p.id ASC"));
    assert_eq!(root.to_string(), "ProduceResults (1 row, 0 DB hits)");
    assert_eq!(
        root.render_tree(),
        "ProduceResults (1 row, 0 DB hits)\n  \
         NodeIndexSeek (1 row, 2 DB hits): p:Person(id) WHERE id = $id\n"
    );
}
