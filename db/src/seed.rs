use super::{
    models::{Instructor, InstructorStatus},
    Database, DbError,
};

pub fn seed_db<D: Database>(db: &mut D) -> Result<(), DbError> {
    db.seed_if_empty(fixtures().into_iter())
}

/// Demo directory loaded on first start.
///
/// Languages are short codes, eg. EN=English, HI=Hindi, NE=Nepali, FA=Dari/Farsi, PS=Pashto.
pub fn fixtures() -> Vec<Instructor> {
    vec![
        instructor("1", "Sara Ahmed", "123 King St W, Toronto", 45, 4.9, "Toronto", &["EN", "AR"], true, "Sedan"),
        instructor("2", "Leo Zhang", "2000 Burnhamthorpe Rd W, Mississauga", 40, 4.6, "Mississauga", &["EN", "ZH"], true, "SUV"),
        instructor("3", "Olivia Brown", "1 Yonge St, Toronto", 50, 5.0, "Toronto", &["EN", "FR"], true, "SUV"),
        instructor("10", "Aarav Sharma", "350 Bay St, Toronto", 44, 4.7, "Toronto", &["EN", "HI"], true, "Sedan"),
        instructor("11", "Ananya Iyer", "720 Kennedy Rd, Scarborough", 39, 4.3, "Scarborough", &["EN", "TA"], false, "Hatchback"),
        instructor("12", "Rohit Verma", "100 City Centre Dr, Mississauga", 42, 4.5, "Mississauga", &["EN", "HI"], true, "Sedan"),
        instructor("13", "Simran Kaur", "10 Queen St E, Brampton", 41, 4.6, "Brampton", &["EN", "PA", "HI"], true, "Sedan"),
        instructor("14", "Sanjay Patel", "5000 Yonge St, North York", 38, 4.2, "North York", &["EN", "GU", "HI"], false, "Sedan"),
        instructor("20", "Sujita Gurung", "55 Lawrence Ave E, Scarborough", 37, 4.4, "Scarborough", &["EN", "NE"], true, "Hatchback"),
        instructor("21", "Prakash Adhikari", "250 The East Mall, Etobicoke", 40, 4.3, "Etobicoke", &["EN", "NE", "HI"], false, "Sedan"),
        instructor("22", "Nabin Shrestha", "15 York St, Toronto", 43, 4.5, "Toronto", &["EN", "NE"], true, "SUV"),
        instructor("30", "Ahmad Wali", "375 Dundas St E, Mississauga", 39, 4.2, "Mississauga", &["EN", "FA", "PS"], true, "Sedan"),
        instructor("31", "Farzana Ahmadi", "365 Finch Ave W, North York", 36, 4.1, "North York", &["EN", "FA"], false, "Sedan"),
        instructor("32", "Omid Rahimi", "45 Overlea Blvd, Toronto", 42, 4.4, "Toronto", &["EN", "PS", "FA"], true, "Sedan"),
        instructor("33", "Zahra Popal", "2150 Lawrence Ave E, Scarborough", 35, 4.0, "Scarborough", &["EN", "FA"], false, "Hatchback"),
        instructor("40", "Mateo Silva", "12 Peel Centre Dr, Brampton", 42, 4.7, "Brampton", &["EN", "ES"], true, "Hatchback"),
        instructor("41", "Jae Park", "250 The East Mall, Etobicoke", 39, 4.4, "Etobicoke", &["EN", "KO"], true, "Sedan"),
        instructor("42", "Igor Petrov", "365 Finch Ave W, North York", 37, 4.1, "North York", &["EN", "RU"], false, "Sedan"),
        instructor("43", "Fatima Khan", "700 Don Mills Rd, North York", 35, 4.0, "North York", &["EN", "UR"], false, "Sedan"),
    ]
}

#[allow(clippy::too_many_arguments)]
fn instructor(
    id: &str,
    name: &str,
    address: &str,
    price_per_hour: u32,
    rating: f64,
    city: &str,
    languages: &[&str],
    verified: bool,
    car_type: &str,
) -> Instructor {
    Instructor {
        id: id.to_string(),
        name: name.to_string(),
        address: address.to_string(),
        price_per_hour,
        rating,
        city: city.to_string(),
        languages: languages.iter().map(|l| l.to_string()).collect(),
        verified,
        car_type: car_type.to_string(),
        photo_url: None,
        status: InstructorStatus::Active,
        availability_days: None,
        availability_start_time: None,
        availability_end_time: None,
    }
}
