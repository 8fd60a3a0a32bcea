use super::{mysql::ndb_mgmd_cnf, scalaris::local_cfg, voldemort::cluster_xml};
use crate::{
    core::select,
    prelude::*,
    process::MockController,
    test_utils::Fixture,
};
use dbherd_common::configs::manifest::{tests::manifest, Manifest, Node};
use std::{
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};
use tempfile::{tempdir, TempDir};

fn with_credentials(m: Manifest, pairs: &[(&str, &str)]) -> Manifest {
    let mut creds = m.credentials().clone();
    for (k, v) in pairs {
        creds.insert(*k, *v);
    }
    Manifest::new(m.nodes().to_vec(), creds)
}

fn with_node(m: Manifest, ip: &str, roles: &[&str]) -> Manifest {
    let mut nodes = m.nodes().to_vec();
    nodes.push(Node::new(ip, "", roles));
    Manifest::new(nodes, m.credentials().clone())
}

fn template(root: &TempDir, backend: &str, name: &str, text: &str) {
    let dir = root.path().join("templates").join(backend);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(name), text).unwrap();
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn first_index(entries: &[String], prefix: &str) -> usize {
    entries
        .iter()
        .position(|e| e.starts_with(prefix))
        .unwrap_or_else(|| panic!("no entry starting with {:?} in {:?}", prefix, entries))
}

fn launched(entries: &[String], needle: &str) -> usize {
    entries
        .iter()
        .position(|e| e.starts_with("start: ") && e.contains(needle))
        .unwrap_or_else(|| panic!("{:?} never launched in {:?}", needle, entries))
}

async fn started_master(backend: BackendType) -> Vec<String> {
    let root = tempdir().unwrap();
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.1", root.path());
    select(backend).start_master(&fx.context()).await.unwrap();
    fx.commands()
}

#[tokio::test]
async fn cassandra_setup_renders_replication_and_seeds() {
    let root = tempdir().unwrap();
    template(
        &root,
        "cassandra",
        "cassandra.yaml",
        "seeds: \"APPSCALE-MASTER\"\nlisten_address: APPSCALE-LOCAL\nreplication_factor: REPLICATION\n",
    );
    let m = manifest(2, 3);
    let fx = Fixture::new(&m, "10.0.0.2", root.path());
    select(BackendType::Cassandra)
        .setup_config(&fx.context())
        .await
        .unwrap();
    let rendered = fs::read_to_string(
        root.path()
            .join("appscale/AppDB/cassandra/conf/cassandra.yaml"),
    )
    .unwrap();
    assert_eq!(
        rendered,
        "seeds: \"10.0.0.1\"\nlisten_address: 10.0.0.2\nreplication_factor: 3\n"
    );
}

#[tokio::test]
async fn slave_waits_for_master_before_launching() {
    let root = tempdir().unwrap();
    template(&root, "cassandra", "cassandra.yaml", "seeds: APPSCALE-MASTER\n");
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.2", root.path());
    select(BackendType::Cassandra)
        .start_slave(&fx.context())
        .await
        .unwrap();
    let log = fx.commands();
    let master_seen = first_index(&log, "probe: 10.0.0.1:9160");
    let launched = first_index(&log, "start: ");
    assert!(master_seen < launched, "{:?}", log);
    assert!(log.last().unwrap().starts_with("probe: 10.0.0.2:9160"));
}

#[tokio::test]
async fn slave_times_out_when_master_never_opens() {
    init_logger();
    let root = tempdir().unwrap();
    let m = manifest(1, 1);
    let fx = Fixture::with_closed_ports(
        &m,
        "10.0.0.2",
        root.path(),
        vec![("10.0.0.1".to_string(), 27017)],
    );
    let started = std::time::Instant::now();
    let err = select(BackendType::MongoDB)
        .start_slave(&fx.context())
        .await
        .unwrap_err();
    assert!(err.is_readiness_timeout());
    assert!(err.to_string().contains("10.0.0.1:27017"));
    assert!(started.elapsed() < std::time::Duration::from_secs(2));
    assert!(fx.actions().is_empty(), "{:?}", fx.actions());
}

#[tokio::test]
async fn hbase_master_starts_in_dependency_order() {
    let root = tempdir().unwrap();
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.1", root.path());
    select(BackendType::HBase)
        .start_master(&fx.context())
        .await
        .unwrap();
    let starts = fx
        .actions()
        .into_iter()
        .filter(|c| c.starts_with("start: "))
        .collect::<Vec<_>>();
    assert_eq!(starts.len(), 4, "{:?}", starts);
    assert!(starts[0].ends_with("start namenode"));
    assert!(starts[1].ends_with("start datanode"));
    assert!(starts[2].ends_with("hbase-daemon.sh start master"));
    assert!(starts[3].ends_with("hbase-daemon.sh start regionserver"));
    let log = fx.commands();
    let datanode = log
        .iter()
        .position(|c| c.starts_with("start: ") && c.ends_with("start datanode"))
        .unwrap();
    assert!(first_index(&log, "probe: 10.0.0.1:9000") < datanode);
    assert!(first_index(&log, "run: ") < first_index(&log, "start: "));
}

#[tokio::test]
async fn hypertable_slave_only_runs_local_servers() {
    let root = tempdir().unwrap();
    template(&root, "hadoop", "core-site.xml", "hdfs://APPSCALE-MASTER:9000\n");
    template(&root, "hypertable", "hypertable.cfg", "Hyperspace.Replica.Host=APPSCALE-MASTER\n");
    let fx = Fixture::new(&manifest(2, 1), "10.0.0.3", root.path());
    select(BackendType::Hypertable)
        .start_slave(&fx.context())
        .await
        .unwrap();
    let log = fx.commands();
    assert!(first_index(&log, "probe: 10.0.0.1:38030") < first_index(&log, "start: "));
    let starts = log
        .iter()
        .filter(|c| c.starts_with("start: "))
        .collect::<Vec<_>>();
    assert_eq!(starts.len(), 3, "{:?}", starts);
    assert!(!starts.iter().any(|c| c.contains("start-master.sh")));
    assert!(!starts.iter().any(|c| c.contains("start-hyperspace.sh")));
}

#[tokio::test]
async fn memcachedb_slave_follows_master_replication_port() {
    let root = tempdir().unwrap();
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.2", root.path());
    select(BackendType::MemcacheDB)
        .start_slave(&fx.context())
        .await
        .unwrap();
    let log = fx.commands();
    assert_eq!(log[0], "probe: 10.0.0.1:30001");
    let start = &log[first_index(&log, "start: ")];
    assert!(start.contains("-R 10.0.0.2:30001"));
    assert!(start.contains("-O 10.0.0.1:30001 -S"));
}

#[tokio::test]
async fn redis_slave_uses_slaveof() {
    let root = tempdir().unwrap();
    template(&root, "redisdb", "redis.conf", "bind APPSCALE-LOCAL\nport 6379\n");
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.2", root.path());
    select(BackendType::Redis)
        .start_slave(&fx.context())
        .await
        .unwrap();
    let actions = fx.actions();
    let start = actions.iter().find(|c| c.starts_with("start: ")).unwrap();
    assert!(start.ends_with("--slaveof 10.0.0.1 6379"), "{}", start);
    let conf =
        fs::read_to_string(root.path().join("appscale/AppDB/redisdb/redis.conf")).unwrap();
    assert_eq!(conf, "bind 10.0.0.2\nport 6379\n");
}

#[tokio::test]
async fn timesten_slave_starts_nothing() {
    let root = tempdir().unwrap();
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.2", root.path());
    let adapter = select(BackendType::TimesTen);
    adapter.start_slave(&fx.context()).await.unwrap();
    adapter.stop_slave(&fx.context()).await;
    assert_eq!(fx.commands(), vec!["probe: 10.0.0.1:53385".to_string()]);
}

#[tokio::test]
async fn scalaris_master_waits_for_health_then_port() {
    let root = tempdir().unwrap();
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.1", root.path());
    let adapter = select(BackendType::Scalaris);
    adapter.setup_config(&fx.context()).await.unwrap();
    adapter.start_master(&fx.context()).await.unwrap();
    let log = fx.commands();
    let start = first_index(&log, "start: ");
    assert!(log[start].contains(" -f -m -d start"));
    let status = first_index(&log, "run: ");
    assert!(log[status].ends_with("status | grep -c running"));
    assert!(start < status);
    assert!(status < first_index(&log, "probe: 10.0.0.1:14195"));
    let stop = first_index(&log, "stop: ");
    for i in [stop, start, status] {
        assert!(log[i].contains(" -n node@10.0.0.1 "), "{}", log[i]);
    }
    assert!(root
        .path()
        .join("appscale/AppDB/scalaris/bin/scalaris.local.cfg")
        .exists());
}

#[tokio::test]
async fn stops_are_best_effort() {
    let root = tempdir().unwrap();
    let fx = Fixture::new(&manifest(1, 1), "10.0.0.1", root.path());
    for backend in BackendType::ALL.iter() {
        let adapter = select(*backend);
        adapter.stop_master(&fx.context()).await;
        adapter.stop_slave(&fx.context()).await;
    }
    assert!(fx.actions().iter().all(|c| c.starts_with("stop: ")));
}

#[tokio::test]
async fn failing_stops_do_not_abort_teardown() {
    init_logger();
    let root = tempdir().unwrap();
    let calls = Arc::new(AtomicUsize::new(0));
    let mut fx = Fixture::new(&manifest(1, 1), "10.0.0.1", root.path());
    let mut process = MockController::new();
    let counter = calls.clone();
    process.expect_stop_daemon().returning(move |cmd| {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(Error::process(cmd, "no such process"))
    });
    fx.process = process;
    for backend in BackendType::ALL.iter() {
        let adapter = select(*backend);
        adapter.stop_master(&fx.context()).await;
        adapter.stop_slave(&fx.context()).await;
    }
    assert!(calls.load(Ordering::SeqCst) >= 2 * BackendType::ALL.len());
}

#[tokio::test]
async fn hypertable_master_starts_servers_in_order() {
    let log = started_master(BackendType::Hypertable).await;
    let order = [
        launched(&log, "start-hyperspace.sh"),
        first_index(&log, "probe: 10.0.0.1:38040"),
        launched(&log, "start-dfsbroker.sh"),
        launched(&log, "start-master.sh"),
        first_index(&log, "probe: 10.0.0.1:38030"),
        launched(&log, "start-rangeserver.sh"),
        first_index(&log, "probe: 10.0.0.1:38060"),
        launched(&log, "start-thriftbroker.sh"),
        first_index(&log, "probe: 10.0.0.1:38080"),
    ];
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", log);
    assert!(first_index(&log, "probe: 10.0.0.1:9000") < order[0]);
    assert!(launched(&log, "start datanode") < order[0]);
}

#[tokio::test]
async fn mysql_master_starts_management_node_first() {
    let log = started_master(BackendType::MySQL).await;
    let order = [
        launched(&log, "ndb_mgmd -f "),
        first_index(&log, "probe: 10.0.0.1:1186"),
        launched(&log, "ndbd --ndb-connectstring=10.0.0.1:1186"),
        launched(&log, "mysqld_safe --defaults-file="),
        first_index(&log, "probe: 10.0.0.1:3306"),
    ];
    assert!(order.windows(2).all(|w| w[0] < w[1]), "{:?}", log);
    assert!(first_index(&log, "stop: ndb_mgm -c 10.0.0.1:1186 -e shutdown") < order[0]);
}

#[tokio::test]
async fn mongodb_master_runs_in_master_mode() {
    let log = started_master(BackendType::MongoDB).await;
    let start = launched(&log, "mongod --master");
    assert!(log[start].contains("--port 27017"), "{}", log[start]);
    assert!(first_index(&log, "stop: ") < start);
    assert!(start < first_index(&log, "probe: 10.0.0.1:27017"));
}

#[tokio::test]
async fn timesten_master_waits_for_both_daemon_ports() {
    let log = started_master(BackendType::TimesTen).await;
    let start = launched(&log, "ttDaemonAdmin -start");
    let main = first_index(&log, "probe: 10.0.0.1:53384");
    assert!(start < main);
    assert!(main < first_index(&log, "probe: 10.0.0.1:53385"));
}

#[tokio::test]
async fn voldemort_master_launches_with_rendered_config() {
    let log = started_master(BackendType::Voldemort).await;
    let start = launched(&log, "bin/voldemort-server.sh");
    assert!(log[start].ends_with("appscale/AppDB/voldemort/config"), "{}", log[start]);
    let socket = first_index(&log, "probe: 10.0.0.1:6666");
    assert!(start < socket);
    assert!(socket < first_index(&log, "probe: 10.0.0.1:6667"));
}

#[test]
fn uaserver_ip_is_nearest_db_node_or_master() {
    let root = tempdir().unwrap();
    let m = with_node(manifest(1, 1), "10.0.0.9", &["load_balancer"]);
    let slave = Fixture::new(&m, "10.0.0.2", root.path());
    let outsider = Fixture::new(&m, "10.0.0.9", root.path());

    let cassandra = select(BackendType::Cassandra);
    assert_eq!(cassandra.uaserver_ip(&slave.context()), "10.0.0.2");
    assert_eq!(cassandra.uaserver_ip(&outsider.context()), "10.0.0.1");

    let mongodb = select(BackendType::MongoDB);
    assert_eq!(mongodb.uaserver_ip(&slave.context()), "10.0.0.1");
    assert_eq!(mongodb.uaserver_ip(&outsider.context()), "10.0.0.1");
}

#[tokio::test]
async fn voldemort_renders_cluster_and_quorums() {
    let root = tempdir().unwrap();
    template(
        &root,
        "voldemort",
        "stores.xml",
        "<replication-factor>REPLICATION</replication-factor>\n<required-reads>VOLDEMORT-R</required-reads>\n<required-writes>VOLDEMORT-W</required-writes>\n",
    );
    template(&root, "voldemort", "server.properties", "node.id=APPSCALE-NODE-ID\n");
    let m = with_credentials(manifest(2, 2), &[("voldemortr", "1"), ("voldemortw", "2")]);
    let fx = Fixture::new(&m, "10.0.0.3", root.path());
    select(BackendType::Voldemort)
        .setup_config(&fx.context())
        .await
        .unwrap();
    let config = root.path().join("appscale/AppDB/voldemort/config");
    let cluster = fs::read_to_string(config.join("cluster.xml")).unwrap();
    assert_eq!(cluster.matches("<server>").count(), 3);
    assert_eq!(
        fs::read_to_string(config.join("server.properties")).unwrap(),
        "node.id=2\n"
    );
    assert_eq!(
        fs::read_to_string(config.join("stores.xml")).unwrap(),
        "<replication-factor>2</replication-factor>\n<required-reads>1</required-reads>\n<required-writes>2</required-writes>\n"
    );
}

#[tokio::test]
async fn voldemort_rejects_missing_quorum_and_oversized_replication() {
    let root = tempdir().unwrap();
    let adapter = select(BackendType::Voldemort);

    let fx = Fixture::new(&manifest(2, 2), "10.0.0.1", root.path());
    assert!(adapter.setup_config(&fx.context()).await.unwrap_err().is_config());

    let m = with_credentials(manifest(1, 3), &[("voldemortr", "1"), ("voldemortw", "1")]);
    let fx = Fixture::new(&m, "10.0.0.1", root.path());
    assert!(adapter.setup_config(&fx.context()).await.unwrap_err().is_config());
    assert!(fx.actions().is_empty());
}

#[test]
fn voldemort_partitions_are_contiguous() {
    let topology = Topology::build(manifest(1, 1).nodes()).unwrap();
    let xml = cluster_xml(&topology);
    assert!(xml.contains("<id>0</id>\n    <host>10.0.0.1</host>"));
    assert!(xml.contains("<partitions>0, 1, 2, 3</partitions>"));
    assert!(xml.contains("<id>1</id>\n    <host>10.0.0.2</host>"));
    assert!(xml.contains("<partitions>4, 5, 6, 7</partitions>"));
}

#[test]
fn mysql_cluster_config_lists_every_db_node() {
    let topology = Topology::build(manifest(3, 2).nodes()).unwrap();
    let replication = Replication::new(2, None, None).unwrap();
    let cnf = ndb_mgmd_cnf(
        &topology,
        &replication,
        Path::new("/var/appscale/mysql-cluster"),
        Path::new("/var/appscale/mysql-mgmd"),
    )
    .unwrap();
    assert!(cnf.starts_with("[ndbd default]\nNoOfReplicas=2\n"));
    assert!(cnf.contains("[ndb_mgmd]\nHostName=10.0.0.1\nDataDir=/var/appscale/mysql-mgmd\n"));
    assert_eq!(cnf.matches("[ndbd]").count(), 4);
    assert_eq!(cnf.matches("[mysqld]").count(), 4);
    assert!(cnf.contains("[ndbd]\nHostName=10.0.0.4\n"));
}

#[test]
fn mysql_rejects_node_count_not_divisible_by_replication() {
    let topology = Topology::build(manifest(2, 2).nodes()).unwrap();
    let replication = Replication::new(2, None, None).unwrap();
    let err = ndb_mgmd_cnf(&topology, &replication, Path::new("/d"), Path::new("/m")).unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn mysql_setup_fails_before_touching_processes() {
    let root = tempdir().unwrap();
    template(&root, "mysql", "my.cnf", "ndb-connectstring=MASTER_IP_ADDRESS\n");
    let fx = Fixture::new(&manifest(2, 2), "10.0.0.1", root.path());
    let err = select(BackendType::MySQL)
        .setup_config(&fx.context())
        .await
        .unwrap_err();
    assert!(err.is_config());
    assert!(fx.commands().is_empty());
}

#[test]
fn scalaris_config_is_erlang_terms() {
    let topology = Topology::build(manifest(1, 1).nodes()).unwrap();
    let replication = Replication::new(1, None, None).unwrap();
    let cfg = local_cfg(&topology, &replication, "10.0.0.2").unwrap();
    assert_eq!(
        cfg,
        "{listen_ip, {10,0,0,2}}.\n\
         {mgmt_server, {{10,0,0,1},14195,mgmt_server}}.\n\
         {known_hosts, [{{10,0,0,1},14195,service_per_vm}, {{10,0,0,2},14195,service_per_vm}]}.\n\
         {replication_factor, 1}.\n"
    );
}

#[test]
fn scalaris_rejects_ipv6_nodes() {
    let nodes = vec![
        Node::new("fd00::1", "", &["db_master"]),
        Node::new("10.0.0.2", "", &["db_slave"]),
    ];
    let topology = Topology::build(&nodes).unwrap();
    let replication = Replication::new(1, None, None).unwrap();
    assert!(local_cfg(&topology, &replication, "10.0.0.2")
        .unwrap_err()
        .is_config());
}
