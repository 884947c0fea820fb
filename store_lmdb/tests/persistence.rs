use std::sync::Arc;

use perkpass_store::{BenefitStore, InsertOutcome, MembershipStore, RedemptionStore};
use perkpass_store_lmdb::LmdbEnvironment;
use perkpass_types::{
    Benefit, BenefitId, BusinessId, Member, MemberId, MembershipType, NewRedemption, Timestamp,
};

const MAP_SIZE: usize = 10 << 20;

fn new_redemption(member: MemberId, business: BusinessId, at: u64) -> NewRedemption {
    NewRedemption {
        member_id: member,
        benefit_id: BenefitId::new(1),
        business_id: business,
        used_at: Timestamp::new(at),
    }
}

#[test]
fn records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let member = Member::provision(
        MemberId::random(),
        "rui@example.com",
        "Rui",
        MembershipType::Resident,
        Timestamp::new(0),
    );
    let business = BusinessId::random();
    let benefit = Benefit {
        id: BenefitId::new(1),
        business_id: business,
        description: "Free coffee".into(),
        discount_percent: 100,
        usage_limit: 1,
        valid_from: None,
        valid_to: None,
        active: true,
    };

    {
        let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
        env.membership_store().put_member(&member).unwrap();
        env.benefit_store().put_benefit(&benefit).unwrap();
        env.redemption_store()
            .insert_if_absent(new_redemption(member.id, business, 1_000), 86_400)
            .unwrap();
        env.sync().unwrap();
    }

    let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
    assert_eq!(env.membership_store().get_member(&member.id).unwrap(), Some(member.clone()));
    assert_eq!(env.benefit_store().list_by_business(&business).unwrap(), vec![benefit]);

    let redemptions = env.redemption_store();
    match redemptions
        .insert_if_absent(new_redemption(member.id, business, 2_000), 86_400)
        .unwrap()
    {
        InsertOutcome::Conflict(existing) => assert_eq!(existing.id.get(), 1),
        InsertOutcome::Inserted(_) => panic!("window must survive reopen"),
    }

    // The id counter continues from the persisted value.
    match redemptions
        .insert_if_absent(new_redemption(MemberId::random(), business, 2_000), 86_400)
        .unwrap()
    {
        InsertOutcome::Inserted(r) => assert_eq!(r.id.get(), 2),
        InsertOutcome::Conflict(_) => panic!("fresh member must not conflict"),
    }
}

#[test]
fn concurrent_inserts_for_one_pair_admit_exactly_one() {
    let dir = tempfile::tempdir().unwrap();
    let env = LmdbEnvironment::open(dir.path(), MAP_SIZE).unwrap();
    let store = Arc::new(env.redemption_store());
    let (member, business) = (MemberId::random(), BusinessId::random());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                store
                    .insert_if_absent(new_redemption(member, business, 5_000 + i), 86_400)
                    .unwrap()
            })
        })
        .collect();

    let outcomes: Vec<InsertOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let inserted = outcomes
        .iter()
        .filter(|o| matches!(o, InsertOutcome::Inserted(_)))
        .count();
    assert_eq!(inserted, 1);
    assert_eq!(store.list_by_member(&member).unwrap().len(), 1);
}
